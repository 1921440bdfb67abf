//! FILENAME: core/table-engine/src/features/column_ordering.rs
//! PURPOSE: Column order state and the placement of grouped columns.

use std::rc::Rc;

use crate::column::{Column, TableColumn};
use crate::header::ColumnRegion;
use crate::options::GroupedColumnMode;
use crate::state::{ColumnOrderState, GroupingState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

/// Applies the column order (ids not listed keep their relative order and
/// follow the listed ones), then places grouped columns per `mode`.
pub(crate) fn order_leaf_columns<T>(
    columns: Vec<Rc<Column<T>>>,
    order: &ColumnOrderState,
    grouping: &GroupingState,
    mode: GroupedColumnMode,
) -> Vec<Rc<Column<T>>> {
    let ordered = if order.is_empty() {
        columns
    } else {
        let mut remaining = columns;
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in order {
            if remaining.is_empty() {
                break;
            }
            if let Some(pos) = remaining.iter().position(|c| c.id == *id) {
                ordered.push(remaining.remove(pos));
            }
        }
        ordered.extend(remaining);
        ordered
    };

    if grouping.is_empty() || mode == GroupedColumnMode::Keep {
        return ordered;
    }
    let (grouped, rest): (Vec<_>, Vec<_>) = ordered.into_iter().partition(|c| grouping.contains(&c.id));
    if mode == GroupedColumnMode::Remove {
        return rest;
    }
    let mut out: Vec<Rc<Column<T>>> = grouping
        .iter()
        .filter_map(|id| grouped.iter().find(|c| c.id == *id).cloned())
        .collect();
    out.extend(rest);
    out
}

impl<T: Record> Table<T> {
    pub fn set_column_order(&self, updater: impl Into<Updater<ColumnOrderState>>) {
        self.update_slice(updater.into(), |s| &mut s.column_order, |o| o.on_column_order_change.as_ref());
    }

    pub fn reset_column_order(&self, default: bool) {
        let next = if default {
            TableState::default().column_order
        } else {
            self.initial_state().column_order.clone()
        };
        self.set_column_order(next);
    }
}

pub trait ColumnOrdering {
    /// Position among the visible leaf columns of `region`.
    fn get_index(&self, region: ColumnRegion) -> Option<usize>;
    fn get_is_first_column(&self, region: ColumnRegion) -> bool;
    fn get_is_last_column(&self, region: ColumnRegion) -> bool;
}

impl<'t, T: Record> ColumnOrdering for TableColumn<'t, T> {
    fn get_index(&self, region: ColumnRegion) -> Option<usize> {
        let layout = self.table.column_layout();
        layout.visible_in(region).iter().position(|c| c.id == self.column.id)
    }

    fn get_is_first_column(&self, region: ColumnRegion) -> bool {
        let layout = self.table.column_layout();
        layout.visible_in(region).first().is_some_and(|c| c.id == self.column.id)
    }

    fn get_is_last_column(&self, region: ColumnRegion) -> bool {
        let layout = self.table.column_layout();
        layout.visible_in(region).last().is_some_and(|c| c.id == self.column.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::options::TableOptions;
    use serde_json::Value as Json;

    fn table() -> Table<Json> {
        let columns = ColumnDefs::new(vec![
            ColumnDef::accessor("a"),
            ColumnDef::accessor("b"),
            ColumnDef::accessor("c"),
            ColumnDef::accessor("d"),
        ])
        .unwrap();
        Table::from_options(TableOptions::new(Vec::new(), columns))
    }

    fn leaf_ids(table: &Table<Json>) -> Vec<String> {
        table.get_all_leaf_columns().iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn test_listed_columns_come_first() {
        let table = table();
        table.set_column_order(vec!["c".to_string(), "x".to_string(), "a".to_string()]);
        assert_eq!(leaf_ids(&table), vec!["c", "a", "b", "d"]);

        let c = table.get_column("c").unwrap();
        assert_eq!(c.get_index(ColumnRegion::All), Some(0));
        assert!(c.get_is_first_column(ColumnRegion::All));
        assert!(table.get_column("d").unwrap().get_is_last_column(ColumnRegion::All));

        table.reset_column_order(true);
        assert_eq!(leaf_ids(&table), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_grouped_columns_move_to_front() {
        let table = table();
        table.set_grouping(vec!["d".to_string(), "b".to_string()]);
        assert_eq!(leaf_ids(&table), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_grouped_column_modes() {
        let defs = ColumnDefs::<Json>::new(vec![
            ColumnDef::accessor("a"),
            ColumnDef::accessor("b"),
            ColumnDef::accessor("c"),
        ])
        .unwrap();
        let leaves = defs.tree().leaves.clone();
        let grouping = vec!["c".to_string()];
        let ids = |cols: Vec<Rc<Column<Json>>>| cols.iter().map(|c| c.id.clone()).collect::<Vec<_>>();

        let removed = order_leaf_columns(leaves.clone(), &Vec::new(), &grouping, GroupedColumnMode::Remove);
        assert_eq!(ids(removed), vec!["a", "b"]);
        let kept = order_leaf_columns(leaves, &Vec::new(), &grouping, GroupedColumnMode::Keep);
        assert_eq!(ids(kept), vec!["a", "b", "c"]);
    }
}
