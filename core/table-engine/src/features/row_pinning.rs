//! FILENAME: core/table-engine/src/features/row_pinning.rs
//! PURPOSE: Row pinning state and the top / center / bottom row split.
//! CONTEXT: With `keep_pinned_rows` a pinned row stays on screen even when
//! filtering or pagination would hide it, as long as all of its parents are
//! expanded. Without it, pinned rows are only taken from the visible rows.

use serde::{Deserialize, Serialize};

use crate::features::{Feature, RowExpanding};
use crate::row::TableRow;
use crate::state::{RowPinningState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPinPosition {
    Top,
    Bottom,
}

impl<T: Record> Table<T> {
    pub fn set_row_pinning(&self, updater: impl Into<Updater<RowPinningState>>) {
        self.update_slice(updater.into(), |s| &mut s.row_pinning, |o| o.on_row_pinning_change.as_ref());
    }

    pub fn reset_row_pinning(&self, default: bool) {
        let next = if default {
            TableState::default().row_pinning
        } else {
            self.initial_state().row_pinning.clone()
        };
        self.set_row_pinning(next);
    }

    /// Any row pinned at `position`, or anywhere when `position` is `None`.
    pub fn get_is_some_rows_pinned(&self, position: Option<RowPinPosition>) -> bool {
        let pinning = self.get_state().row_pinning;
        match position {
            Some(RowPinPosition::Top) => !pinning.top.is_empty(),
            Some(RowPinPosition::Bottom) => !pinning.bottom.is_empty(),
            None => !pinning.top.is_empty() || !pinning.bottom.is_empty(),
        }
    }

    pub fn get_top_rows(&self) -> Vec<TableRow<'_, T>> {
        let ids = self.get_state().row_pinning.top;
        self.pinned_rows(&ids)
    }

    pub fn get_bottom_rows(&self) -> Vec<TableRow<'_, T>> {
        let ids = self.get_state().row_pinning.bottom;
        self.pinned_rows(&ids)
    }

    /// Rows of the final row model that are pinned neither top nor bottom.
    pub fn get_center_rows(&self) -> Vec<TableRow<'_, T>> {
        let pinning = self.get_state().row_pinning;
        let Some(model) = self.visible_model() else {
            return Vec::new();
        };
        model
            .rows
            .iter()
            .filter(|row| !pinning.top.contains(&row.id) && !pinning.bottom.contains(&row.id))
            .map(|row| self.row_handle(row.clone()))
            .collect()
    }

    fn pinned_rows(&self, ids: &[String]) -> Vec<TableRow<'_, T>> {
        if self.options().settings.keep_pinned_rows {
            return ids
                .iter()
                .filter_map(|id| match self.get_row(id) {
                    Ok(row) => Some(row),
                    Err(_) => {
                        log::warn!(target: "table_engine::pinning", "pinned row '{}' no longer exists", id);
                        None
                    }
                })
                .filter(|row| row.get_is_all_parents_expanded())
                .collect();
        }
        let Some(model) = self.visible_model() else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| model.rows.iter().find(|row| row.id == *id))
            .map(|row| self.row_handle(row.clone()))
            .collect()
    }

    fn visible_model(&self) -> Option<std::rc::Rc<crate::row::RowModel<T>>> {
        match self.get_row_model() {
            Ok(model) => Some(model),
            Err(err) => {
                log::warn!(target: "table_engine::pinning", "no visible rows: {}", err);
                None
            }
        }
    }
}

pub trait RowPinning {
    /// Pins at `position` (or unpins with `None`), optionally together with
    /// every descendant and every ancestor.
    fn pin(&self, position: Option<RowPinPosition>, include_leaf_rows: bool, include_parent_rows: bool);
    fn get_can_pin(&self) -> bool;
    fn get_is_pinned(&self) -> Option<RowPinPosition>;
    /// Position among the rows pinned on the same side.
    fn get_pinned_index(&self) -> Option<usize>;
}

impl<'t, T: Record> RowPinning for TableRow<'t, T> {
    fn pin(&self, position: Option<RowPinPosition>, include_leaf_rows: bool, include_parent_rows: bool) {
        let mut ids: Vec<String> = Vec::new();
        if include_parent_rows {
            ids.extend(self.get_parent_rows().iter().map(|row| row.id.clone()));
        }
        ids.push(self.row.id.clone());
        if include_leaf_rows {
            ids.extend(self.row.get_leaf_rows().iter().map(|row| row.id.clone()));
        }
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        self.table.set_row_pinning(Updater::with(move |old: &RowPinningState| {
            let keep = |list: &[String]| -> Vec<String> {
                list.iter().filter(|id| !unique.contains(id)).cloned().collect()
            };
            let mut top = keep(&old.top);
            let mut bottom = keep(&old.bottom);
            match position {
                Some(RowPinPosition::Top) => top.extend(unique.iter().cloned()),
                Some(RowPinPosition::Bottom) => bottom.extend(unique.iter().cloned()),
                None => {}
            }
            RowPinningState { top, bottom }
        }));
    }

    fn get_can_pin(&self) -> bool {
        self.table.has_feature(Feature::RowPinning) && self.table.options().settings.enable_row_pinning
    }

    fn get_is_pinned(&self) -> Option<RowPinPosition> {
        let pinning = self.table.get_state().row_pinning;
        if pinning.top.contains(&self.row.id) {
            Some(RowPinPosition::Top)
        } else if pinning.bottom.contains(&self.row.id) {
            Some(RowPinPosition::Bottom)
        } else {
            None
        }
    }

    fn get_pinned_index(&self) -> Option<usize> {
        let rows = match self.get_is_pinned()? {
            RowPinPosition::Top => self.table.get_top_rows(),
            RowPinPosition::Bottom => self.table.get_bottom_rows(),
        };
        rows.iter().position(|row| row.id == self.row.id)
    }
}
