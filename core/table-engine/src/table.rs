//! FILENAME: core/table-engine/src/table.rs
//! Table - The orchestrator that ties options, state, columns, headers and rows together.
//!
//! A `Table` re-reads its options through the provider on every access and
//! keeps only three things of its own:
//! - the uncontrolled state store (controlled slices are overlaid on read)
//! - the initial state captured at construction (used by the reset operations)
//! - memo cells for every derived structure
//!
//! Feature operations are inherent methods spread over `features/*`, and the
//! row-model getters live in `row_models/mod.rs`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::column::{Column, ColumnTree, TableColumn};
use crate::error::{TableError, TableResult};
use crate::features::column_ordering::order_leaf_columns;
use crate::features::column_pinning::split_pinned;
use crate::features::column_visibility::is_column_visible;
use crate::features::faceting::FacetMemos;
use crate::features::row_selection::SelectionMemos;
use crate::features::Feature;
use crate::header::{build_header_groups, leaf_headers_of, ColumnRegion, Header, HeaderGroup, TableHeader};
use crate::options::{GroupedColumnMode, OnChange, OptionsProvider, SharedOptions, TableOptions};
use crate::row::{Row, TableRow};
use crate::row_models::PipelineMemos;
use crate::state::{ColumnOrderState, ColumnPinningState, GroupingState, TableState, VisibilityState};
use crate::utils::{functional_update, Memo, PtrEq, Updater};
use crate::value::Record;

pub(crate) type ColumnList<T> = Rc<Vec<Rc<Column<T>>>>;
/// Header rows, shared between reads until the column layout changes.
pub type HeaderGroups<T> = Rc<Vec<Rc<HeaderGroup<T>>>>;

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

/// Ordered leaf columns split by pin region, with and without hidden columns.
pub(crate) struct ColumnLayout<T> {
    pub(crate) left: Vec<Rc<Column<T>>>,
    pub(crate) center: Vec<Rc<Column<T>>>,
    pub(crate) right: Vec<Rc<Column<T>>>,
    pub(crate) visible_left: Vec<Rc<Column<T>>>,
    pub(crate) visible_center: Vec<Rc<Column<T>>>,
    pub(crate) visible_right: Vec<Rc<Column<T>>>,
    /// Left, center, right.
    pub(crate) visible: ColumnList<T>,
    pub(crate) visibility: VisibilityState,
}

impl<T> ColumnLayout<T> {
    fn build(ordered: &[Rc<Column<T>>], pinning: &ColumnPinningState, visibility: &VisibilityState) -> Self {
        let (left, center, right) = split_pinned(ordered, pinning);
        let keep_visible = |columns: &[Rc<Column<T>>]| -> Vec<Rc<Column<T>>> {
            columns
                .iter()
                .filter(|c| is_column_visible(c, visibility))
                .cloned()
                .collect()
        };
        let visible_left = keep_visible(&left);
        let visible_center = keep_visible(&center);
        let visible_right = keep_visible(&right);
        let visible = visible_left
            .iter()
            .chain(&visible_center)
            .chain(&visible_right)
            .cloned()
            .collect();
        ColumnLayout {
            left,
            center,
            right,
            visible_left,
            visible_center,
            visible_right,
            visible: Rc::new(visible),
            visibility: visibility.clone(),
        }
    }

    pub(crate) fn visible_in(&self, region: ColumnRegion) -> &[Rc<Column<T>>] {
        match region {
            ColumnRegion::All => &self.visible,
            ColumnRegion::Left => &self.visible_left,
            ColumnRegion::Center => &self.visible_center,
            ColumnRegion::Right => &self.visible_right,
        }
    }
}

type OrderDeps<T> = (PtrEq<ColumnTree<T>>, ColumnOrderState, GroupingState, GroupedColumnMode);
type LayoutDeps<T> = (PtrEq<Vec<Rc<Column<T>>>>, ColumnPinningState, VisibilityState);
type HeaderDeps<T> = (PtrEq<ColumnTree<T>>, PtrEq<ColumnLayout<T>>);

/// Every memo cell a table owns.
pub(crate) struct TableMemos<T> {
    pub(crate) ordered_leaf_columns: Memo<OrderDeps<T>, ColumnList<T>>,
    pub(crate) column_layout: Memo<LayoutDeps<T>, Rc<ColumnLayout<T>>>,
    pub(crate) header_groups: Memo<HeaderDeps<T>, HeaderGroups<T>>,
    pub(crate) left_header_groups: Memo<HeaderDeps<T>, HeaderGroups<T>>,
    pub(crate) center_header_groups: Memo<HeaderDeps<T>, HeaderGroups<T>>,
    pub(crate) right_header_groups: Memo<HeaderDeps<T>, HeaderGroups<T>>,
    pub(crate) pipeline: PipelineMemos<T>,
    pub(crate) selection: SelectionMemos<T>,
    pub(crate) facets: FacetMemos<T>,
}

impl<T> TableMemos<T> {
    fn new() -> Self {
        TableMemos {
            ordered_leaf_columns: Memo::new("getAllLeafColumns"),
            column_layout: Memo::new("getVisibleLeafColumns"),
            header_groups: Memo::new("getHeaderGroups"),
            left_header_groups: Memo::new("getLeftHeaderGroups"),
            center_header_groups: Memo::new("getCenterHeaderGroups"),
            right_header_groups: Memo::new("getRightHeaderGroups"),
            pipeline: PipelineMemos::new(),
            selection: SelectionMemos::new(),
            facets: FacetMemos::new(),
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

pub struct Table<T> {
    provider: Box<dyn OptionsProvider<T>>,
    store: RefCell<TableState>,
    initial_state: TableState,
    pub(crate) memos: TableMemos<T>,
}

impl<T: Record> Table<T> {
    /// Creates a table pulling its options from `provider`.
    pub fn new(provider: impl OptionsProvider<T> + 'static) -> Self {
        let options = provider.resolve();
        let mut initial_state = TableState::default();
        options.initial_state.apply_to(&mut initial_state);

        if options.settings.debug_table_enabled() {
            log::debug!(
                target: "table_engine::table",
                "creating table: {} records, {} columns, features {:?}",
                options.data.len(),
                options.columns.tree().flat.len(),
                options.features
            );
        }

        Table {
            provider: Box::new(provider),
            store: RefCell::new(initial_state.clone()),
            initial_state,
            memos: TableMemos::new(),
        }
    }

    /// Creates a table over fixed options.
    pub fn from_options(options: TableOptions<T>) -> Self {
        Table::new(SharedOptions::new(options))
    }

    /// The current options, freshly resolved.
    pub fn options(&self) -> Rc<TableOptions<T>> {
        self.provider.resolve()
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.options().features.contains(&feature)
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// The composed state: the internal store with every controlled slice overlaid.
    pub fn get_state(&self) -> TableState {
        let mut state = self.store.borrow().clone();
        self.options().state.apply_to(&mut state);
        state
    }

    pub fn initial_state(&self) -> &TableState {
        &self.initial_state
    }

    /// Applies `updater` to the composed state. Uncontrolled slices are
    /// written to the store; `on_state_change` receives the full next state.
    pub fn set_state(&self, updater: impl Into<Updater<TableState>>) {
        let next = functional_update(updater.into(), &self.get_state());
        self.commit(next);
    }

    /// Like `set_state`, but the updater may refuse. A refusal changes nothing.
    pub fn try_set_state<E>(&self, f: impl FnOnce(&TableState) -> Result<TableState, E>) -> Result<(), E> {
        let next = f(&self.get_state())?;
        self.commit(next);
        Ok(())
    }

    /// Restores the initial state.
    pub fn reset(&self) {
        self.set_state(self.initial_state.clone());
    }

    fn commit(&self, next: TableState) {
        let options = self.options();
        options
            .state
            .assign_uncontrolled(&mut self.store.borrow_mut(), &next);
        if let Some(on_change) = &options.on_state_change {
            on_change(&next);
        }
    }

    /// Updates one slice. A slice change callback, when present, receives the
    /// next value instead of the table writing it.
    pub(crate) fn update_slice<S: Clone>(
        &self,
        updater: Updater<S>,
        slot: fn(&mut TableState) -> &mut S,
        callback: fn(&TableOptions<T>) -> Option<&OnChange<S>>,
    ) {
        let mut next = self.get_state();
        let value = functional_update(updater, slot(&mut next));
        let options = self.options();
        if let Some(on_change) = callback(&options) {
            on_change(&value);
            return;
        }
        *slot(&mut next) = value;
        self.commit(next);
    }

    // ------------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------------

    pub(crate) fn column_tree(&self) -> Rc<ColumnTree<T>> {
        Rc::clone(self.options().columns.tree())
    }

    pub(crate) fn column_rc(&self, column_id: &str) -> Option<Rc<Column<T>>> {
        self.options().columns.tree().by_id.get(column_id).cloned()
    }

    pub(crate) fn column_handles(&self, columns: impl IntoIterator<Item = Rc<Column<T>>>) -> Vec<TableColumn<'_, T>> {
        columns.into_iter().map(|c| TableColumn::new(self, c)).collect()
    }

    /// Top-level columns in declaration order.
    pub fn get_all_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_tree().roots.iter().cloned())
    }

    /// Every column, pre-order.
    pub fn get_all_flat_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.column_tree().flat.iter().cloned())
    }

    /// Leaf columns in display order (column order, then grouped-column placement).
    pub fn get_all_leaf_columns(&self) -> Vec<TableColumn<'_, T>> {
        self.column_handles(self.ordered_leaf_columns().iter().cloned())
    }

    /// Looks a column up by id. Unknown ids are `None`, never an error.
    pub fn get_column(&self, column_id: &str) -> Option<TableColumn<'_, T>> {
        let column = self.column_rc(column_id);
        if column.is_none() {
            log::trace!(target: "table_engine::columns", "no column with id '{}'", column_id);
        }
        column.map(|c| TableColumn::new(self, c))
    }

    pub(crate) fn ordered_leaf_columns(&self) -> ColumnList<T> {
        let options = self.options();
        let state = self.get_state();
        let order = if self.has_feature(Feature::ColumnOrdering) {
            state.column_order
        } else {
            Vec::new()
        };
        let grouping = if self.has_feature(Feature::ColumnGrouping) {
            state.grouping
        } else {
            Vec::new()
        };
        let deps = (
            PtrEq::new(options.columns.tree()),
            order,
            grouping,
            options.settings.grouped_column_mode,
        );
        self.memos.ordered_leaf_columns.get_logged(
            deps,
            options.settings.debug_columns_enabled(),
            |(tree, order, grouping, mode)| {
                Rc::new(order_leaf_columns(tree.0.leaves.clone(), order, grouping, *mode))
            },
        )
    }

    /// Reorders a subset of leaf columns the way the full leaf list is ordered.
    pub(crate) fn order_columns(&self, columns: Vec<Rc<Column<T>>>) -> Vec<Rc<Column<T>>> {
        let state = self.get_state();
        let mode = self.options().settings.grouped_column_mode;
        order_leaf_columns(columns, &state.column_order, &state.grouping, mode)
    }

    pub(crate) fn column_layout(&self) -> Rc<ColumnLayout<T>> {
        let ordered = self.ordered_leaf_columns();
        let state = self.get_state();
        let pinning = if self.has_feature(Feature::ColumnPinning) {
            state.column_pinning
        } else {
            ColumnPinningState::default()
        };
        let visibility = if self.has_feature(Feature::ColumnVisibility) {
            state.column_visibility
        } else {
            VisibilityState::default()
        };
        let debug = self.options().settings.debug_columns_enabled();
        self.memos
            .column_layout
            .get_logged((PtrEq(ordered), pinning, visibility), debug, |(ordered, pinning, visibility)| {
                Rc::new(ColumnLayout::build(&ordered.0, pinning, visibility))
            })
    }

    /// Visible leaf columns: pinned left, center, pinned right.
    pub(crate) fn visible_leaf_columns(&self) -> ColumnList<T> {
        Rc::clone(&self.column_layout().visible)
    }

    // ------------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------------

    pub(crate) fn header_groups_for(&self, region: ColumnRegion) -> HeaderGroups<T> {
        let options = self.options();
        let layout = self.column_layout();
        let memo = match region {
            ColumnRegion::All => &self.memos.header_groups,
            ColumnRegion::Left => &self.memos.left_header_groups,
            ColumnRegion::Center => &self.memos.center_header_groups,
            ColumnRegion::Right => &self.memos.right_header_groups,
        };
        let deps = (PtrEq::new(options.columns.tree()), PtrEq(layout));
        memo.get_logged(deps, options.settings.debug_headers_enabled(), |(tree, layout)| {
            let layout = &layout.0;
            let is_visible = |column: &Rc<Column<T>>| is_column_visible(column, &layout.visibility);
            let groups = build_header_groups(
                &tree.0.roots,
                layout.visible_in(region),
                &tree.0.by_id,
                region,
                &is_visible,
            );
            Rc::new(groups.into_iter().map(Rc::new).collect())
        })
    }

    /// Header rows, top first.
    pub fn get_header_groups(&self) -> HeaderGroups<T> {
        self.header_groups_for(ColumnRegion::All)
    }

    pub fn get_left_header_groups(&self) -> HeaderGroups<T> {
        self.header_groups_for(ColumnRegion::Left)
    }

    pub fn get_center_header_groups(&self) -> HeaderGroups<T> {
        self.header_groups_for(ColumnRegion::Center)
    }

    pub fn get_right_header_groups(&self) -> HeaderGroups<T> {
        self.header_groups_for(ColumnRegion::Right)
    }

    /// Header rows, bottom first.
    pub fn get_footer_groups(&self) -> Vec<Rc<HeaderGroup<T>>> {
        self.get_header_groups().iter().rev().cloned().collect()
    }

    pub fn get_left_footer_groups(&self) -> Vec<Rc<HeaderGroup<T>>> {
        self.get_left_header_groups().iter().rev().cloned().collect()
    }

    pub fn get_center_footer_groups(&self) -> Vec<Rc<HeaderGroup<T>>> {
        self.get_center_header_groups().iter().rev().cloned().collect()
    }

    pub fn get_right_footer_groups(&self) -> Vec<Rc<HeaderGroup<T>>> {
        self.get_right_header_groups().iter().rev().cloned().collect()
    }

    /// Every header of every group, top group first.
    pub fn get_flat_headers(&self) -> Vec<TableHeader<'_, T>> {
        self.get_header_groups()
            .iter()
            .flat_map(|group| group.headers.iter().cloned())
            .map(|h| TableHeader::new(self, h))
            .collect()
    }

    /// Headers of the visible leaf columns.
    pub fn get_leaf_headers(&self) -> Vec<TableHeader<'_, T>> {
        let groups = self.get_header_groups();
        let Some(top) = groups.first() else {
            return Vec::new();
        };
        top.headers
            .iter()
            .flat_map(leaf_headers_of)
            .map(|h| TableHeader::new(self, h))
            .collect()
    }

    pub fn header_handle(&self, header: Rc<Header<T>>) -> TableHeader<'_, T> {
        TableHeader::new(self, header)
    }

    // ------------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------------

    pub fn row_handle(&self, row: Rc<Row<T>>) -> TableRow<'_, T> {
        TableRow::new(self, row)
    }

    pub fn wrap_rows(&self, rows: &[Rc<Row<T>>]) -> Vec<TableRow<'_, T>> {
        rows.iter().map(|row| TableRow::new(self, Rc::clone(row))).collect()
    }

    /// Finds a row in the final row model, then before pagination, then in
    /// the core model. An unknown id is an error.
    pub fn get_row(&self, row_id: &str) -> TableResult<TableRow<'_, T>> {
        let lookups = [self.get_row_model(), self.get_pre_pagination_row_model()];
        for model in lookups.iter().flatten() {
            if let Some(row) = model.rows_by_id.get(row_id) {
                return Ok(self.row_handle(Rc::clone(row)));
            }
        }
        match self.get_core_row_model().rows_by_id.get(row_id) {
            Some(row) => Ok(self.row_handle(Rc::clone(row))),
            None => Err(TableError::RowNotFound(row_id.to_string())),
        }
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("state", &self.store.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::state::{ColumnSort, PartialTableState};
    use serde_json::{json, Value as Json};
    use std::cell::Cell;

    fn people() -> TableOptions<Json> {
        let columns = ColumnDefs::new(vec![ColumnDef::accessor("name"), ColumnDef::accessor("age")]).unwrap();
        TableOptions::new(
            vec![
                json!({ "name": "Alice", "age": 30 }),
                json!({ "name": "Bob", "age": 25 }),
            ],
            columns,
        )
    }

    #[test]
    fn test_initial_state_overrides_defaults() {
        let options = people().with_initial_state(PartialTableState {
            sorting: Some(vec![ColumnSort::asc("age")]),
            ..Default::default()
        });
        let table = Table::from_options(options);
        assert_eq!(table.get_state().sorting, vec![ColumnSort::asc("age")]);
        assert_eq!(table.get_state().pagination.page_size, 10);
    }

    #[test]
    fn test_set_state_and_reset() {
        let table = Table::from_options(people());
        table.set_state(Updater::with(|old: &TableState| TableState {
            grouping: vec!["age".to_string()],
            ..old.clone()
        }));
        assert_eq!(table.get_state().grouping, vec!["age".to_string()]);
        table.reset();
        assert!(table.get_state().grouping.is_empty());
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let table = Table::from_options(people());
        let result: Result<(), &str> = table.try_set_state(|_| Err("nope"));
        assert!(result.is_err());
        assert_eq!(table.get_state(), TableState::default());
    }

    #[test]
    fn test_controlled_slice_is_not_stored() {
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let options = people()
            .with_state(PartialTableState {
                sorting: Some(vec![ColumnSort::asc("name")]),
                ..Default::default()
            })
            .on_state_change(move |_| counter.set(counter.get() + 1));
        let table = Table::from_options(options);

        table.set_state(Updater::with(|old: &TableState| TableState {
            sorting: vec![ColumnSort::desc("age")],
            grouping: vec!["name".to_string()],
            ..old.clone()
        }));
        assert_eq!(table.get_state().sorting, vec![ColumnSort::asc("name")]);
        assert_eq!(table.get_state().grouping, vec!["name".to_string()]);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_column_lookup() {
        let table = Table::from_options(people());
        assert!(table.get_column("name").is_some());
        assert!(table.get_column("missing").is_none());
        assert_eq!(table.get_all_leaf_columns().len(), 2);
    }

    #[test]
    fn test_header_groups_are_memoized() {
        let table = Table::from_options(people());
        let a = table.get_header_groups();
        let b = table.get_header_groups();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(table.get_leaf_headers().len(), 2);
        assert_eq!(table.get_flat_headers().len(), 2);
    }
}
