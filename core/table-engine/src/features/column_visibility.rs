//! FILENAME: core/table-engine/src/features/column_visibility.rs
//! PURPOSE: Column visibility state and visibility queries.

use std::rc::Rc;

use crate::column::{Column, TableColumn};
use crate::features::Feature;
use crate::state::{TableState, VisibilityState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

/// A leaf is visible unless the state hides it; a group column is visible
/// when any of its children is.
pub(crate) fn is_column_visible<T>(column: &Rc<Column<T>>, visibility: &VisibilityState) -> bool {
    if column.columns.is_empty() {
        return visibility.get(&column.id).copied().unwrap_or(true);
    }
    column.columns.iter().any(|child| is_column_visible(child, visibility))
}

impl<T: Record> Table<T> {
    pub fn set_column_visibility(&self, updater: impl Into<Updater<VisibilityState>>) {
        self.update_slice(updater.into(), |s| &mut s.column_visibility, |o| {
            o.on_column_visibility_change.as_ref()
        });
    }

    pub fn reset_column_visibility(&self, default: bool) {
        let next = if default {
            TableState::default().column_visibility
        } else {
            self.initial_state().column_visibility.clone()
        };
        self.set_column_visibility(next);
    }

    /// Shows every leaf column, or hides every leaf column that can be
    /// hidden. `None` flips based on whether all are currently visible.
    pub fn toggle_all_columns_visible(&self, visible: Option<bool>) {
        let visible = visible.unwrap_or_else(|| !self.get_is_all_columns_visible());
        let next: VisibilityState = self
            .get_all_leaf_columns()
            .iter()
            .map(|column| {
                let value = if visible { true } else { !column.get_can_hide() };
                (column.id.clone(), value)
            })
            .collect();
        self.set_column_visibility(next);
    }

    pub fn get_is_all_columns_visible(&self) -> bool {
        self.get_all_leaf_columns().iter().all(|c| c.get_is_visible())
    }

    pub fn get_is_some_columns_visible(&self) -> bool {
        self.get_all_leaf_columns().iter().any(|c| c.get_is_visible())
    }

    /// Visible columns of every depth, pre-order.
    pub fn get_visible_flat_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.get_all_flat_columns()
            .into_iter()
            .filter(|c| c.get_is_visible())
            .collect()
    }

    /// Visible leaf columns: pinned left, center, pinned right.
    pub fn get_visible_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.visible_leaf_columns().iter().cloned())
    }
}

pub trait ColumnVisibility {
    fn get_is_visible(&self) -> bool;
    fn get_can_hide(&self) -> bool;
    /// `Some` forces the state, `None` flips it. Ignored when the column cannot hide.
    fn toggle_visibility(&self, visible: Option<bool>);
}

impl<'t, T: Record> ColumnVisibility for TableColumn<'t, T> {
    fn get_is_visible(&self) -> bool {
        if !self.table.has_feature(Feature::ColumnVisibility) {
            return true;
        }
        is_column_visible(&self.column, &self.table.get_state().column_visibility)
    }

    fn get_can_hide(&self) -> bool {
        self.table.has_feature(Feature::ColumnVisibility)
            && self.column.def.enable_hiding.unwrap_or(true)
            && self.table.options().settings.enable_hiding
    }

    fn toggle_visibility(&self, visible: Option<bool>) {
        if !self.get_can_hide() {
            return;
        }
        let column_id = self.column.id.clone();
        let visible = visible.unwrap_or_else(|| !self.get_is_visible());
        self.table.set_column_visibility(Updater::with(move |old: &VisibilityState| {
            let mut next = old.clone();
            next.insert(column_id, visible);
            next
        }));
    }
}
