//! FILENAME: core/table-engine/src/features/column_pinning.rs
//! PURPOSE: Column pinning state and the left / center / right column split.
//! CONTEXT: Pinned columns follow the order of their pin list, center columns
//! keep the resolved column order. Pinning a group column pins its leaves.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cell::TableCell;
use crate::column::{leaf_columns_of, Column, TableColumn};
use crate::features::Feature;
use crate::row::TableRow;
use crate::state::{ColumnPinningState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPinPosition {
    Left,
    Right,
}

type Split<T> = (Vec<Rc<Column<T>>>, Vec<Rc<Column<T>>>, Vec<Rc<Column<T>>>);

/// Splits ordered leaf columns into pinned-left (pin-list order), center and
/// pinned-right (pin-list order). Pinned ids without a column are skipped.
pub(crate) fn split_pinned<T>(ordered: &[Rc<Column<T>>], pinning: &ColumnPinningState) -> Split<T> {
    let pick = |ids: &[String]| -> Vec<Rc<Column<T>>> {
        ids.iter()
            .filter_map(|id| ordered.iter().find(|c| c.id == *id).cloned())
            .collect()
    };
    let left = pick(&pinning.left);
    let right = pick(&pinning.right);
    let center = ordered
        .iter()
        .filter(|c| !pinning.left.contains(&c.id) && !pinning.right.contains(&c.id))
        .cloned()
        .collect();
    (left, center, right)
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    pub fn set_column_pinning(&self, updater: impl Into<Updater<ColumnPinningState>>) {
        self.update_slice(updater.into(), |s| &mut s.column_pinning, |o| o.on_column_pinning_change.as_ref());
    }

    pub fn reset_column_pinning(&self, default: bool) {
        let next = if default {
            TableState::default().column_pinning
        } else {
            self.initial_state().column_pinning.clone()
        };
        self.set_column_pinning(next);
    }

    pub fn get_is_some_columns_pinned(&self, position: Option<ColumnPinPosition>) -> bool {
        let pinning = self.get_state().column_pinning;
        match position {
            Some(ColumnPinPosition::Left) => !pinning.left.is_empty(),
            Some(ColumnPinPosition::Right) => !pinning.right.is_empty(),
            None => !pinning.left.is_empty() || !pinning.right.is_empty(),
        }
    }

    pub fn get_left_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_layout().left.iter().cloned())
    }

    pub fn get_center_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_layout().center.iter().cloned())
    }

    pub fn get_right_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_layout().right.iter().cloned())
    }

    pub fn get_left_visible_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_layout().visible_left.iter().cloned())
    }

    pub fn get_center_visible_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_layout().visible_center.iter().cloned())
    }

    pub fn get_right_visible_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_layout().visible_right.iter().cloned())
    }
}

// ============================================================================
// COLUMN CAPABILITY
// ============================================================================

pub trait ColumnPinning {
    /// Pins every leaf beneath this column at `position`, or unpins them.
    fn pin(&self, position: Option<ColumnPinPosition>);
    fn get_can_pin(&self) -> bool;
    fn get_is_pinned(&self) -> Option<ColumnPinPosition>;
    /// Position in the pin list of its side.
    fn get_pinned_index(&self) -> Option<usize>;
}

impl<'t, T: Record> ColumnPinning for TableColumn<'t, T> {
    fn pin(&self, position: Option<ColumnPinPosition>) {
        let leaf_ids: Vec<String> = leaf_columns_of(&self.column).iter().map(|c| c.id.clone()).collect();
        self.table.set_column_pinning(Updater::with(move |old: &ColumnPinningState| {
            let keep = |ids: &[String]| -> Vec<String> {
                ids.iter().filter(|id| !leaf_ids.contains(id)).cloned().collect()
            };
            let mut left = keep(&old.left);
            let mut right = keep(&old.right);
            match position {
                Some(ColumnPinPosition::Left) => left.extend(leaf_ids.iter().cloned()),
                Some(ColumnPinPosition::Right) => right.extend(leaf_ids.iter().cloned()),
                None => {}
            }
            ColumnPinningState { left, right }
        }));
    }

    fn get_can_pin(&self) -> bool {
        if !self.table.has_feature(Feature::ColumnPinning) || !self.table.options().settings.enable_column_pinning {
            return false;
        }
        leaf_columns_of(&self.column)
            .iter()
            .any(|c| c.def.enable_pinning.unwrap_or(true))
    }

    fn get_is_pinned(&self) -> Option<ColumnPinPosition> {
        let pinning = self.table.get_state().column_pinning;
        let leaves = leaf_columns_of(&self.column);
        if leaves.iter().any(|c| pinning.left.contains(&c.id)) {
            Some(ColumnPinPosition::Left)
        } else if leaves.iter().any(|c| pinning.right.contains(&c.id)) {
            Some(ColumnPinPosition::Right)
        } else {
            None
        }
    }

    fn get_pinned_index(&self) -> Option<usize> {
        let pinning = self.table.get_state().column_pinning;
        let list = match self.get_is_pinned()? {
            ColumnPinPosition::Left => pinning.left,
            ColumnPinPosition::Right => pinning.right,
        };
        list.iter().position(|id| *id == self.column.id)
    }
}

// ============================================================================
// ROW CELLS
// ============================================================================

impl<'t, T: Record> TableRow<'t, T> {
    pub fn get_left_visible_cells(&self) -> Vec<TableCell<'t, T>> {
        self.cells_of(&self.table.column_layout().visible_left)
    }

    pub fn get_center_visible_cells(&self) -> Vec<TableCell<'t, T>> {
        self.cells_of(&self.table.column_layout().visible_center)
    }

    pub fn get_right_visible_cells(&self) -> Vec<TableCell<'t, T>> {
        self.cells_of(&self.table.column_layout().visible_right)
    }

    fn cells_of(&self, columns: &[Rc<Column<T>>]) -> Vec<TableCell<'t, T>> {
        columns
            .iter()
            .map(|column| TableCell::new(self.table, Rc::clone(&self.row), Rc::clone(column)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::options::TableOptions;
    use serde_json::{json, Value as Json};

    fn table() -> Table<Json> {
        let columns = ColumnDefs::new(vec![
            ColumnDef::accessor("id"),
            ColumnDef::group("Name", vec![ColumnDef::accessor("first"), ColumnDef::accessor("last")]),
            ColumnDef::accessor("age"),
            ColumnDef::accessor("notes").enable_pinning(false),
        ])
        .unwrap();
        let data = vec![json!({ "id": 1, "first": "Ada", "last": "Byron", "age": 36 })];
        Table::from_options(TableOptions::new(data, columns))
    }

    fn ids(columns: &[TableColumn<'_, Json>]) -> Vec<String> {
        columns.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn test_pin_splits_leaf_columns() {
        let table = table();
        table.get_column("age").unwrap().pin(Some(ColumnPinPosition::Left));
        table.get_column("id").unwrap().pin(Some(ColumnPinPosition::Right));

        assert_eq!(ids(&table.get_left_leaf_columns()), vec!["age"]);
        assert_eq!(ids(&table.get_center_leaf_columns()), vec!["first", "last", "notes"]);
        assert_eq!(ids(&table.get_right_leaf_columns()), vec!["id"]);
        assert!(table.get_is_some_columns_pinned(Some(ColumnPinPosition::Right)));

        let row = table.get_row("0").unwrap();
        let cells: Vec<_> = row.get_visible_cells().iter().map(|c| c.column_id().to_string()).collect();
        assert_eq!(cells, vec!["age", "first", "last", "notes", "id"]);
        assert_eq!(row.get_left_visible_cells().len(), 1);
    }

    #[test]
    fn test_group_column_pins_its_leaves() {
        let table = table();
        let name = table.get_column("Name").unwrap();
        name.pin(Some(ColumnPinPosition::Left));
        assert_eq!(table.get_state().column_pinning.left, vec!["first", "last"]);
        assert_eq!(name.get_is_pinned(), Some(ColumnPinPosition::Left));
        assert_eq!(table.get_column("last").unwrap().get_pinned_index(), Some(1));

        name.pin(Some(ColumnPinPosition::Right));
        assert!(table.get_state().column_pinning.left.is_empty());
        name.pin(None);
        assert!(!table.get_is_some_columns_pinned(None));
    }

    #[test]
    fn test_pinning_can_be_disabled_per_column() {
        let table = table();
        assert!(table.get_column("age").unwrap().get_can_pin());
        assert!(!table.get_column("notes").unwrap().get_can_pin());
    }

    #[test]
    fn test_split_skips_unknown_ids() {
        let defs = ColumnDefs::<Json>::new(vec![ColumnDef::accessor("a"), ColumnDef::accessor("b")]).unwrap();
        let pinning = ColumnPinningState {
            left: vec!["gone".to_string(), "b".to_string()],
            right: Vec::new(),
        };
        let (left, center, right) = split_pinned(&defs.tree().leaves, &pinning);
        assert_eq!(left.len(), 1);
        assert_eq!(center[0].id, "a");
        assert!(right.is_empty());
    }
}
