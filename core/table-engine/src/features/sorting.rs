//! FILENAME: core/table-engine/src/features/sorting.rs
//! PURPOSE: Sorting state and the column sorting capability.
//! CONTEXT: A single-sort toggle cycles first direction -> other direction ->
//! unsorted. A multi-sort toggle appends the column (trimming the oldest
//! entries past `max_multi_sort_col_count`) or cycles its existing entry.

use serde::{Deserialize, Serialize};

use crate::column::{lookup_named, FnRef, TableColumn};
use crate::error::{TableError, TableResult};
use crate::features::sorting_fns::{self, SortingFn, AUTO_SAMPLE_ROWS};
use crate::features::Feature;
use crate::state::{ColumnSort, SortingState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn is_desc(self) -> bool {
        self == SortDirection::Desc
    }

    fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    pub fn set_sorting(&self, updater: impl Into<Updater<SortingState>>) {
        self.update_slice(updater.into(), |s| &mut s.sorting, |o| o.on_sorting_change.as_ref());
    }

    /// Back to the initial sorting, or to no sorting when `default` is set.
    pub fn reset_sorting(&self, default: bool) {
        let next = if default {
            TableState::default().sorting
        } else {
            self.initial_state().sorting.clone()
        };
        self.set_sorting(next);
    }
}

// ============================================================================
// COLUMN CAPABILITY
// ============================================================================

pub trait ColumnSorting<T: Record> {
    /// Comparator inferred from the first rows of the core model.
    fn get_auto_sorting_fn(&self) -> SortingFn<T>;
    fn get_sorting_fn(&self) -> TableResult<SortingFn<T>>;
    /// Ascending unless the column or the table sets `sort_desc_first`.
    fn get_first_sort_dir(&self) -> SortDirection;
    /// Direction the next toggle moves to; `None` means the entry is removed.
    fn get_next_sorting_order(&self, multi: bool) -> Option<SortDirection>;
    fn get_can_sort(&self) -> bool;
    fn get_can_multi_sort(&self) -> bool;
    fn get_is_sorted(&self) -> Option<SortDirection>;
    fn get_sort_index(&self) -> Option<usize>;
    /// `desc` forces a direction; otherwise the column cycles.
    fn toggle_sorting(&self, desc: Option<bool>, multi: bool);
    fn clear_sorting(&self);
}

impl<'t, T: Record> ColumnSorting<T> for TableColumn<'t, T> {
    fn get_auto_sorting_fn(&self) -> SortingFn<T> {
        let core = self.table.get_core_row_model();
        let samples: Vec<Value> = core
            .flat_rows
            .iter()
            .take(AUTO_SAMPLE_ROWS)
            .map(|row| self.table.row_handle(row.clone()).get_value(&self.column.id))
            .collect();
        let name = sorting_fns::auto_name_for(&samples);
        sorting_fns::builtin(name).unwrap_or_else(sorting_fns::basic)
    }

    fn get_sorting_fn(&self) -> TableResult<SortingFn<T>> {
        match &self.column.def.sorting_fn {
            FnRef::Auto => Ok(self.get_auto_sorting_fn()),
            FnRef::Custom(f) => Ok(f.clone()),
            FnRef::Named(name) => {
                let options = self.table.options();
                lookup_named(name, &options.sorting_fns, sorting_fns::builtin).ok_or_else(|| {
                    TableError::UnknownSortingFn {
                        column_id: self.column.id.clone(),
                        name: name.clone(),
                    }
                })
            }
        }
    }

    fn get_first_sort_dir(&self) -> SortDirection {
        let desc_first = self
            .column
            .def
            .sort_desc_first
            .or(self.table.options().settings.sort_desc_first)
            .unwrap_or(false);
        if desc_first {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    fn get_next_sorting_order(&self, multi: bool) -> Option<SortDirection> {
        let first = self.get_first_sort_dir();
        let Some(current) = self.get_is_sorted() else {
            return Some(first);
        };
        let settings = &self.table.options().settings;
        let removal_allowed = settings.enable_sorting_removal && (!multi || settings.enable_multi_remove);
        if current != first && removal_allowed {
            return None;
        }
        Some(current.flipped())
    }

    fn get_can_sort(&self) -> bool {
        self.table.has_feature(Feature::RowSorting)
            && self.column.def.enable_sorting.unwrap_or(true)
            && self.table.options().settings.enable_sorting
            && self.column.has_accessor()
    }

    fn get_can_multi_sort(&self) -> bool {
        let settings = &self.table.options().settings;
        self.column
            .def
            .enable_multi_sort
            .unwrap_or(settings.enable_multi_sort && self.column.has_accessor())
    }

    fn get_is_sorted(&self) -> Option<SortDirection> {
        let sorting = self.table.get_state().sorting;
        sorting.iter().find(|s| s.id == self.column.id).map(|s| {
            if s.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            }
        })
    }

    fn get_sort_index(&self) -> Option<usize> {
        self.table.get_state().sorting.iter().position(|s| s.id == self.column.id)
    }

    fn toggle_sorting(&self, desc: Option<bool>, multi: bool) {
        let column_id = self.column.id.clone();
        let next_order = self.get_next_sorting_order(multi);
        let can_multi = self.get_can_multi_sort();
        let max_count = self.table.options().settings.max_multi_sort_col_count;

        self.table.set_sorting(Updater::with(move |old: &SortingState| {
            let existing = old.iter().position(|s| s.id == column_id);
            let next_desc = desc.unwrap_or(next_order == Some(SortDirection::Desc));

            let mut action = if !old.is_empty() && can_multi && multi {
                if existing.is_some() {
                    SortAction::Toggle
                } else {
                    SortAction::Add
                }
            } else if !old.is_empty() && existing != Some(old.len() - 1) {
                SortAction::Replace
            } else if existing.is_some() {
                SortAction::Toggle
            } else {
                SortAction::Replace
            };
            if action == SortAction::Toggle && desc.is_none() && next_order.is_none() {
                action = SortAction::Remove;
            }

            match action {
                SortAction::Add => {
                    let mut next = old.clone();
                    next.push(ColumnSort {
                        id: column_id.clone(),
                        desc: next_desc,
                    });
                    if let Some(max) = max_count {
                        let excess = next.len().saturating_sub(max);
                        next.drain(..excess);
                    }
                    next
                }
                SortAction::Toggle => old
                    .iter()
                    .map(|s| {
                        if s.id == column_id {
                            ColumnSort {
                                id: s.id.clone(),
                                desc: next_desc,
                            }
                        } else {
                            s.clone()
                        }
                    })
                    .collect(),
                SortAction::Remove => old.iter().filter(|s| s.id != column_id).cloned().collect(),
                SortAction::Replace => vec![ColumnSort {
                    id: column_id.clone(),
                    desc: next_desc,
                }],
            }
        }));
    }

    fn clear_sorting(&self) {
        let column_id = self.column.id.clone();
        self.table.set_sorting(Updater::with(move |old: &SortingState| {
            old.iter().filter(|s| s.id != column_id).cloned().collect()
        }));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortAction {
    Add,
    Toggle,
    Remove,
    Replace,
}
