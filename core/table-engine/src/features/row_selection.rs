//! FILENAME: core/table-engine/src/features/row_selection.rs
//! PURPOSE: Row selection state, tri-state parent selection and the selected row models.
//! CONTEXT: Selecting a row cascades to its descendants (unless sub-row
//! selection is disabled). A parent's display state is derived from its
//! descendants: all selectable descendants selected, some, or none.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::TableResult;
use crate::features::Feature;
use crate::row::{index_rows, Row, RowModel, TableRow};
use crate::state::{RowSelectionState, TableState};
use crate::table::Table;
use crate::utils::{Memo, PtrEq, Updater};
use crate::value::Record;

/// Tri-state selection of a row and its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionState {
    All,
    Some,
    None,
}

type SelectionDeps<T> = (RowSelectionState, PtrEq<RowModel<T>>);

pub(crate) struct SelectionMemos<T> {
    selected: Memo<SelectionDeps<T>, Rc<RowModel<T>>>,
    filtered_selected: Memo<SelectionDeps<T>, Rc<RowModel<T>>>,
    grouped_selected: Memo<SelectionDeps<T>, Rc<RowModel<T>>>,
}

impl<T> SelectionMemos<T> {
    pub(crate) fn new() -> Self {
        SelectionMemos {
            selected: Memo::new("getSelectedRowModel"),
            filtered_selected: Memo::new("getFilteredSelectedRowModel"),
            grouped_selected: Memo::new("getGroupedSelectedRowModel"),
        }
    }
}

/// Table-wide selection switches, captured before an update runs.
#[derive(Debug, Clone, Copy)]
struct SelectionCaps {
    can_select: bool,
    can_multi_select: bool,
    can_select_sub_rows: bool,
}

impl SelectionCaps {
    fn of<T: Record>(table: &Table<T>) -> Self {
        let settings = &table.options().settings;
        let installed = table.has_feature(Feature::RowSelection);
        SelectionCaps {
            can_select: installed && settings.enable_row_selection,
            can_multi_select: settings.enable_multi_row_selection,
            can_select_sub_rows: settings.enable_sub_row_selection,
        }
    }
}

fn is_row_selected(id: &str, selection: &RowSelectionState) -> bool {
    selection.get(id).copied().unwrap_or(false)
}

/// Writes `value` for `row` (and, when asked, every descendant) into `selection`.
fn mutate_row_is_selected<T>(
    selection: &mut RowSelectionState,
    row: &Rc<Row<T>>,
    value: bool,
    include_children: bool,
    caps: SelectionCaps,
) {
    if value {
        if !caps.can_multi_select {
            selection.clear();
        }
        if caps.can_select {
            selection.insert(row.id.clone(), true);
        }
    } else {
        selection.remove(&row.id);
    }

    if include_children && caps.can_select_sub_rows {
        for child in &row.sub_rows {
            mutate_row_is_selected(selection, child, value, include_children, caps);
        }
    }
}

fn sub_row_selection<T>(row: &Row<T>, selection: &RowSelectionState, caps: SelectionCaps) -> SelectionState {
    if row.sub_rows.is_empty() {
        return SelectionState::None;
    }
    let mut all = true;
    let mut some = false;
    for child in &row.sub_rows {
        if some && !all {
            break;
        }
        if caps.can_select {
            if is_row_selected(&child.id, selection) {
                some = true;
            } else {
                all = false;
            }
        }
        if !child.sub_rows.is_empty() {
            match sub_row_selection(child, selection, caps) {
                SelectionState::All => some = true,
                SelectionState::Some => {
                    some = true;
                    all = false;
                }
                SelectionState::None => all = false,
            }
        }
    }
    if all {
        SelectionState::All
    } else if some {
        SelectionState::Some
    } else {
        SelectionState::None
    }
}

/// Keeps selected rows only. An unselected parent drops out of `rows`, but
/// its selected descendants are still listed in `flat_rows`.
fn select_rows<T>(model: &RowModel<T>, selection: &RowSelectionState) -> RowModel<T> {
    fn recurse<T>(rows: &[Rc<Row<T>>], selection: &RowSelectionState, flat: &mut Vec<Rc<Row<T>>>) -> Vec<Rc<Row<T>>> {
        let mut kept = Vec::new();
        for row in rows {
            let selected = is_row_selected(&row.id, selection);
            let at = flat.len();
            if selected {
                flat.push(Rc::clone(row));
            }
            let row = if row.sub_rows.is_empty() {
                Rc::clone(row)
            } else {
                Rc::new(row.with_sub_rows(recurse(&row.sub_rows, selection, flat)))
            };
            if selected {
                flat[at] = Rc::clone(&row);
                kept.push(row);
            }
        }
        kept
    }

    let mut flat_rows = Vec::new();
    let rows = recurse(&model.rows, selection, &mut flat_rows);
    let rows_by_id = index_rows(&flat_rows);
    RowModel {
        rows,
        flat_rows,
        rows_by_id,
    }
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    pub fn set_row_selection(&self, updater: impl Into<Updater<RowSelectionState>>) {
        self.update_slice(updater.into(), |s| &mut s.row_selection, |o| o.on_row_selection_change.as_ref());
    }

    pub fn reset_row_selection(&self, default: bool) {
        let next = if default {
            TableState::default().row_selection
        } else {
            self.initial_state().row_selection.clone()
        };
        self.set_row_selection(next);
    }

    /// Selects (or clears) every selectable row before grouping.
    pub fn toggle_all_rows_selected(&self, value: Option<bool>) {
        let value = value.unwrap_or_else(|| !self.get_is_all_rows_selected());
        let caps = SelectionCaps::of(self);
        let rows = self.rows_or_core(self.get_pre_grouped_row_model());
        let mut selection = self.get_state().row_selection;
        for row in &rows.flat_rows {
            if value {
                if caps.can_select {
                    selection.insert(row.id.clone(), true);
                }
            } else {
                selection.remove(&row.id);
            }
        }
        self.set_row_selection(selection);
    }

    /// Selects (or clears) the rows of the current page, with their descendants.
    pub fn toggle_all_page_rows_selected(&self, value: Option<bool>) {
        let value = value.unwrap_or_else(|| !self.get_is_all_page_rows_selected());
        let caps = SelectionCaps::of(self);
        let rows = self.rows_or_core(self.get_row_model());
        let mut selection = self.get_state().row_selection;
        for row in &rows.rows {
            mutate_row_is_selected(&mut selection, row, value, true, caps);
        }
        self.set_row_selection(selection);
    }

    pub fn get_is_all_rows_selected(&self) -> bool {
        let caps = SelectionCaps::of(self);
        let selection = self.get_state().row_selection;
        let rows = self.rows_or_core(self.get_filtered_row_model());
        if rows.flat_rows.is_empty() || selection.is_empty() {
            return false;
        }
        !(caps.can_select && rows.flat_rows.iter().any(|row| !is_row_selected(&row.id, &selection)))
    }

    pub fn get_is_some_rows_selected(&self) -> bool {
        let selected = self.get_state().row_selection.len();
        let total = self.rows_or_core(self.get_filtered_row_model()).flat_rows.len();
        selected > 0 && selected < total
    }

    pub fn get_is_all_page_rows_selected(&self) -> bool {
        let caps = SelectionCaps::of(self);
        if !caps.can_select {
            return false;
        }
        let selection = self.get_state().row_selection;
        let page = self.rows_or_core(self.get_pagination_row_model());
        !page.flat_rows.is_empty() && page.flat_rows.iter().all(|row| is_row_selected(&row.id, &selection))
    }

    pub fn get_is_some_page_rows_selected(&self) -> bool {
        if self.get_is_all_page_rows_selected() || !SelectionCaps::of(self).can_select {
            return false;
        }
        let page = self.rows_or_core(self.get_pagination_row_model());
        page.flat_rows.iter().any(|row| {
            let handle = self.row_handle(Rc::clone(row));
            handle.get_is_selected() || handle.get_is_some_selected()
        })
    }

    /// Selected rows of the core model.
    pub fn get_selected_row_model(&self) -> Rc<RowModel<T>> {
        let core = self.get_core_row_model();
        self.selected_model_of(&self.memos.selection.selected, core)
    }

    /// Selected rows that survive filtering.
    pub fn get_filtered_selected_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        let filtered = self.get_filtered_row_model()?;
        Ok(self.selected_model_of(&self.memos.selection.filtered_selected, filtered))
    }

    /// Selected rows after grouping and sorting.
    pub fn get_grouped_selected_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        let sorted = self.get_sorted_row_model()?;
        Ok(self.selected_model_of(&self.memos.selection.grouped_selected, sorted))
    }

    fn selected_model_of(&self, memo: &Memo<SelectionDeps<T>, Rc<RowModel<T>>>, input: Rc<RowModel<T>>) -> Rc<RowModel<T>> {
        let selection = self.get_state().row_selection;
        let debug = self.options().settings.debug_rows_enabled();
        memo.get_logged((selection, PtrEq(input)), debug, |(selection, input)| {
            if selection.is_empty() {
                return Rc::new(RowModel::empty());
            }
            Rc::new(select_rows(&input.0, selection))
        })
    }

    fn rows_or_core(&self, model: TableResult<Rc<RowModel<T>>>) -> Rc<RowModel<T>> {
        model.unwrap_or_else(|err| {
            log::warn!(target: "table_engine::selection", "using core rows: {}", err);
            self.get_core_row_model()
        })
    }
}

// ============================================================================
// ROW CAPABILITY
// ============================================================================

pub trait RowSelection {
    /// `None` flips the current state. `select_children` cascades to descendants.
    fn toggle_selected(&self, value: Option<bool>, select_children: bool);
    fn get_is_selected(&self) -> bool;
    /// Some, but not all, selectable descendants are selected.
    fn get_is_some_selected(&self) -> bool;
    fn get_is_all_sub_rows_selected(&self) -> bool;
    /// This row's tri-state: its own flag for a leaf, its descendants for a parent.
    fn get_selection_state(&self) -> SelectionState;
    fn get_can_select(&self) -> bool;
    fn get_can_select_sub_rows(&self) -> bool;
    fn get_can_multi_select(&self) -> bool;
}

impl<'t, T: Record> RowSelection for TableRow<'t, T> {
    fn toggle_selected(&self, value: Option<bool>, select_children: bool) {
        let caps = SelectionCaps::of(self.table);
        let is_selected = self.get_is_selected();
        let value = value.unwrap_or(!is_selected);
        if caps.can_select && is_selected == value {
            return;
        }
        let mut selection = self.table.get_state().row_selection;
        mutate_row_is_selected(&mut selection, &self.row, value, select_children, caps);
        self.table.set_row_selection(selection);
    }

    fn get_is_selected(&self) -> bool {
        is_row_selected(&self.row.id, &self.table.get_state().row_selection)
    }

    fn get_is_some_selected(&self) -> bool {
        let caps = SelectionCaps::of(self.table);
        sub_row_selection(&self.row, &self.table.get_state().row_selection, caps) == SelectionState::Some
    }

    fn get_is_all_sub_rows_selected(&self) -> bool {
        let caps = SelectionCaps::of(self.table);
        sub_row_selection(&self.row, &self.table.get_state().row_selection, caps) == SelectionState::All
    }

    fn get_selection_state(&self) -> SelectionState {
        if self.row.sub_rows.is_empty() {
            return if self.get_is_selected() {
                SelectionState::All
            } else {
                SelectionState::None
            };
        }
        let caps = SelectionCaps::of(self.table);
        sub_row_selection(&self.row, &self.table.get_state().row_selection, caps)
    }

    fn get_can_select(&self) -> bool {
        SelectionCaps::of(self.table).can_select
    }

    fn get_can_select_sub_rows(&self) -> bool {
        SelectionCaps::of(self.table).can_select_sub_rows
    }

    fn get_can_multi_select(&self) -> bool {
        SelectionCaps::of(self.table).can_multi_select
    }
}
