//! FILENAME: core/table-engine/src/options.rs
//! Table Options - Everything a caller configures a table with.
//!
//! `TableOptions` is re-read through an `OptionsProvider` on every access,
//! so a provider can hand out new data or columns without an explicit
//! "set options" call. `TableSettings` is the plain-data part (switches and
//! limits) and is serializable on its own.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::column::{ColumnDefs, FnRef};
use crate::features::aggregation_fns::AggregationFn;
use crate::features::filter_fns::FilterFn;
use crate::features::sorting_fns::SortingFn;
use crate::features::Feature;
use crate::row_models::RowModelPipeline;
use crate::state::{
    ColumnFiltersState, ColumnOrderState, ColumnPinningState, ColumnSizingInfoState,
    ColumnSizingState, ExpandedState, GroupingState, PaginationState, PartialTableState,
    RowPinningState, RowSelectionState, SortingState, TableState, VisibilityState,
};
use crate::value::{Record, Value};

/// Change callback. Receives the resolved next value of a slice (or of the whole state).
pub type OnChange<S> = Rc<dyn Fn(&S)>;

/// Derives a row id from the record, its index among its siblings and the parent row id.
pub type RowIdFn<T> = Rc<dyn Fn(&T, usize, Option<&str>) -> String>;

/// Returns the child records of a record, if it has any.
pub type SubRowsFn<T> = Rc<dyn Fn(&T, usize) -> Option<&[T]>>;

// ============================================================================
// SETTINGS
// ============================================================================

/// How grouped columns are placed among the leaf columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GroupedColumnMode {
    /// Grouped columns move to the front, in grouping order.
    #[default]
    Reorder,
    /// Grouped columns are dropped from the leaf columns.
    Remove,
    /// Leaf column order is left alone.
    Keep,
}

/// When drag-resizing writes column sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColumnResizeMode {
    /// Sizes are written once, when the drag ends.
    #[default]
    OnEnd,
    /// Sizes are written on every pointer move.
    OnChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColumnResizeDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Switches and limits for every feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    // --- sorting ---
    #[serde(default = "default_true")]
    pub enable_sorting: bool,
    #[serde(default = "default_true")]
    pub enable_multi_sort: bool,
    /// Allow the toggle cycle to pass through "unsorted".
    #[serde(default = "default_true")]
    pub enable_sorting_removal: bool,
    /// Allow multi-sort toggles to remove an entry.
    #[serde(default = "default_true")]
    pub enable_multi_remove: bool,
    /// Table-wide first direction; `None` lets each column decide from its data.
    pub sort_desc_first: Option<bool>,
    /// Oldest entries are dropped once multi-sort exceeds this count.
    pub max_multi_sort_col_count: Option<usize>,
    pub manual_sorting: bool,

    // --- filtering ---
    #[serde(default = "default_true")]
    pub enable_filters: bool,
    #[serde(default = "default_true")]
    pub enable_column_filters: bool,
    #[serde(default = "default_true")]
    pub enable_global_filter: bool,
    pub manual_filtering: bool,
    /// Keep a parent when any descendant matches, instead of filtering top-down.
    pub filter_from_leaf_rows: bool,
    #[serde(default = "default_max_leaf_row_filter_depth")]
    pub max_leaf_row_filter_depth: usize,

    // --- grouping ---
    #[serde(default = "default_true")]
    pub enable_grouping: bool,
    pub manual_grouping: bool,
    pub grouped_column_mode: GroupedColumnMode,

    // --- expanding ---
    #[serde(default = "default_true")]
    pub enable_expanding: bool,
    pub manual_expanding: bool,
    /// When false, pages are cut from top-level rows and expanded afterwards.
    #[serde(default = "default_true")]
    pub paginate_expanded_rows: bool,

    // --- pagination ---
    pub manual_pagination: bool,
    /// Known page count (server-side pagination). Clamps `set_page_index`.
    pub page_count: Option<usize>,
    /// Known row count (server-side pagination).
    pub row_count: Option<usize>,

    // --- row selection ---
    #[serde(default = "default_true")]
    pub enable_row_selection: bool,
    #[serde(default = "default_true")]
    pub enable_multi_row_selection: bool,
    #[serde(default = "default_true")]
    pub enable_sub_row_selection: bool,

    // --- row pinning ---
    #[serde(default = "default_true")]
    pub enable_row_pinning: bool,
    /// Pinned rows stay visible even when filtered or paged out.
    #[serde(default = "default_true")]
    pub keep_pinned_rows: bool,

    // --- columns ---
    #[serde(default = "default_true")]
    pub enable_column_pinning: bool,
    #[serde(default = "default_true")]
    pub enable_hiding: bool,
    #[serde(default = "default_true")]
    pub enable_column_resizing: bool,
    pub column_resize_mode: ColumnResizeMode,
    pub column_resize_direction: ColumnResizeDirection,

    // --- debugging ---
    pub debug_all: bool,
    pub debug_table: bool,
    pub debug_rows: bool,
    pub debug_columns: bool,
    pub debug_headers: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_leaf_row_filter_depth() -> usize {
    100
}

impl Default for TableSettings {
    fn default() -> Self {
        TableSettings {
            enable_sorting: true,
            enable_multi_sort: true,
            enable_sorting_removal: true,
            enable_multi_remove: true,
            sort_desc_first: None,
            max_multi_sort_col_count: None,
            manual_sorting: false,
            enable_filters: true,
            enable_column_filters: true,
            enable_global_filter: true,
            manual_filtering: false,
            filter_from_leaf_rows: false,
            max_leaf_row_filter_depth: default_max_leaf_row_filter_depth(),
            enable_grouping: true,
            manual_grouping: false,
            grouped_column_mode: GroupedColumnMode::Reorder,
            enable_expanding: true,
            manual_expanding: false,
            paginate_expanded_rows: true,
            manual_pagination: false,
            page_count: None,
            row_count: None,
            enable_row_selection: true,
            enable_multi_row_selection: true,
            enable_sub_row_selection: true,
            enable_row_pinning: true,
            keep_pinned_rows: true,
            enable_column_pinning: true,
            enable_hiding: true,
            enable_column_resizing: true,
            column_resize_mode: ColumnResizeMode::OnEnd,
            column_resize_direction: ColumnResizeDirection::Ltr,
            debug_all: false,
            debug_table: false,
            debug_rows: false,
            debug_columns: false,
            debug_headers: false,
        }
    }
}

impl TableSettings {
    pub fn debug_rows_enabled(&self) -> bool {
        self.debug_all || self.debug_rows
    }

    pub fn debug_columns_enabled(&self) -> bool {
        self.debug_all || self.debug_columns
    }

    pub fn debug_headers_enabled(&self) -> bool {
        self.debug_all || self.debug_headers
    }

    pub fn debug_table_enabled(&self) -> bool {
        self.debug_all || self.debug_table
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// The full option set a provider hands to the table.
pub struct TableOptions<T> {
    pub data: Rc<Vec<T>>,
    pub columns: ColumnDefs<T>,

    /// Controlled slices. Every `Some` slice is owned by the caller.
    pub state: PartialTableState,
    /// Overrides applied on top of the feature defaults at construction and on `reset`.
    pub initial_state: PartialTableState,

    pub on_state_change: Option<OnChange<TableState>>,
    pub on_sorting_change: Option<OnChange<SortingState>>,
    pub on_column_filters_change: Option<OnChange<ColumnFiltersState>>,
    pub on_global_filter_change: Option<OnChange<Value>>,
    pub on_grouping_change: Option<OnChange<GroupingState>>,
    pub on_expanded_change: Option<OnChange<ExpandedState>>,
    pub on_pagination_change: Option<OnChange<PaginationState>>,
    pub on_row_selection_change: Option<OnChange<RowSelectionState>>,
    pub on_row_pinning_change: Option<OnChange<RowPinningState>>,
    pub on_column_pinning_change: Option<OnChange<ColumnPinningState>>,
    pub on_column_sizing_change: Option<OnChange<ColumnSizingState>>,
    pub on_column_sizing_info_change: Option<OnChange<ColumnSizingInfoState>>,
    pub on_column_visibility_change: Option<OnChange<VisibilityState>>,
    pub on_column_order_change: Option<OnChange<ColumnOrderState>>,

    /// Custom functions, looked up by name before the built-ins.
    pub filter_fns: FxHashMap<String, FilterFn<T>>,
    pub sorting_fns: FxHashMap<String, SortingFn<T>>,
    pub aggregation_fns: FxHashMap<String, AggregationFn<T>>,
    pub global_filter_fn: FnRef<FilterFn<T>>,

    pub get_row_id: Option<RowIdFn<T>>,
    pub get_sub_rows: Option<SubRowsFn<T>>,

    pub pipeline: RowModelPipeline,
    pub features: Vec<Feature>,
    pub settings: TableSettings,
}

impl<T: Record> TableOptions<T> {
    pub fn new(data: Vec<T>, columns: ColumnDefs<T>) -> Self {
        TableOptions {
            data: Rc::new(data),
            columns,
            state: PartialTableState::default(),
            initial_state: PartialTableState::default(),
            on_state_change: None,
            on_sorting_change: None,
            on_column_filters_change: None,
            on_global_filter_change: None,
            on_grouping_change: None,
            on_expanded_change: None,
            on_pagination_change: None,
            on_row_selection_change: None,
            on_row_pinning_change: None,
            on_column_pinning_change: None,
            on_column_sizing_change: None,
            on_column_sizing_info_change: None,
            on_column_visibility_change: None,
            on_column_order_change: None,
            filter_fns: FxHashMap::default(),
            sorting_fns: FxHashMap::default(),
            aggregation_fns: FxHashMap::default(),
            global_filter_fn: FnRef::Auto,
            get_row_id: None,
            get_sub_rows: None,
            pipeline: RowModelPipeline::default(),
            features: Feature::ALL.to_vec(),
            settings: TableSettings::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: RowModelPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_settings(mut self, settings: TableSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_state(mut self, state: PartialTableState) -> Self {
        self.state = state;
        self
    }

    pub fn with_initial_state(mut self, initial_state: PartialTableState) -> Self {
        self.initial_state = initial_state;
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_row_id(mut self, f: impl Fn(&T, usize, Option<&str>) -> String + 'static) -> Self {
        self.get_row_id = Some(Rc::new(f));
        self
    }

    pub fn with_sub_rows(mut self, f: impl Fn(&T, usize) -> Option<&[T]> + 'static) -> Self {
        self.get_sub_rows = Some(Rc::new(f));
        self
    }

    pub fn with_global_filter_fn(mut self, global_filter_fn: FnRef<FilterFn<T>>) -> Self {
        self.global_filter_fn = global_filter_fn;
        self
    }

    pub fn on_state_change(mut self, f: impl Fn(&TableState) + 'static) -> Self {
        self.on_state_change = Some(Rc::new(f));
        self
    }

    pub fn register_filter_fn(mut self, name: impl Into<String>, f: FilterFn<T>) -> Self {
        self.filter_fns.insert(name.into(), f);
        self
    }

    pub fn register_sorting_fn(mut self, name: impl Into<String>, f: SortingFn<T>) -> Self {
        self.sorting_fns.insert(name.into(), f);
        self
    }

    pub fn register_aggregation_fn(mut self, name: impl Into<String>, f: AggregationFn<T>) -> Self {
        self.aggregation_fns.insert(name.into(), f);
        self
    }

    /// Replaces the data, keeping everything else.
    pub fn with_data(mut self, data: Vec<T>) -> Self {
        self.data = Rc::new(data);
        self
    }
}

impl<T> Clone for TableOptions<T> {
    fn clone(&self) -> Self {
        TableOptions {
            data: Rc::clone(&self.data),
            columns: self.columns.clone(),
            state: self.state.clone(),
            initial_state: self.initial_state.clone(),
            on_state_change: self.on_state_change.clone(),
            on_sorting_change: self.on_sorting_change.clone(),
            on_column_filters_change: self.on_column_filters_change.clone(),
            on_global_filter_change: self.on_global_filter_change.clone(),
            on_grouping_change: self.on_grouping_change.clone(),
            on_expanded_change: self.on_expanded_change.clone(),
            on_pagination_change: self.on_pagination_change.clone(),
            on_row_selection_change: self.on_row_selection_change.clone(),
            on_row_pinning_change: self.on_row_pinning_change.clone(),
            on_column_pinning_change: self.on_column_pinning_change.clone(),
            on_column_sizing_change: self.on_column_sizing_change.clone(),
            on_column_sizing_info_change: self.on_column_sizing_info_change.clone(),
            on_column_visibility_change: self.on_column_visibility_change.clone(),
            on_column_order_change: self.on_column_order_change.clone(),
            filter_fns: self.filter_fns.clone(),
            sorting_fns: self.sorting_fns.clone(),
            aggregation_fns: self.aggregation_fns.clone(),
            global_filter_fn: self.global_filter_fn.clone(),
            get_row_id: self.get_row_id.clone(),
            get_sub_rows: self.get_sub_rows.clone(),
            pipeline: self.pipeline.clone(),
            features: self.features.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<T> fmt::Debug for TableOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableOptions")
            .field("rows", &self.data.len())
            .field("state", &self.state)
            .field("initial_state", &self.initial_state)
            .field("pipeline", &self.pipeline)
            .field("features", &self.features)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// Pull-based source of options. Invoked on every table access, so it should
/// be cheap (hand out a cached `Rc`).
pub trait OptionsProvider<T> {
    fn resolve(&self) -> Rc<TableOptions<T>>;
}

impl<T, F> OptionsProvider<T> for F
where
    F: Fn() -> Rc<TableOptions<T>>,
{
    fn resolve(&self) -> Rc<TableOptions<T>> {
        self()
    }
}

/// A cloneable options cell. The table holds one handle and the caller keeps
/// another to swap options in later.
pub struct SharedOptions<T> {
    current: Rc<RefCell<Rc<TableOptions<T>>>>,
}

impl<T> SharedOptions<T> {
    pub fn new(options: TableOptions<T>) -> Self {
        SharedOptions {
            current: Rc::new(RefCell::new(Rc::new(options))),
        }
    }

    /// Replaces the options wholesale.
    pub fn set(&self, options: TableOptions<T>) {
        *self.current.borrow_mut() = Rc::new(options);
    }

    /// Derives new options from the current ones.
    pub fn update(&self, f: impl FnOnce(TableOptions<T>) -> TableOptions<T>) {
        let current = TableOptions::clone(&self.current.borrow());
        self.set(f(current));
    }

    pub fn get(&self) -> Rc<TableOptions<T>> {
        Rc::clone(&self.current.borrow())
    }
}

impl<T> Clone for SharedOptions<T> {
    fn clone(&self) -> Self {
        SharedOptions {
            current: Rc::clone(&self.current),
        }
    }
}

impl<T> OptionsProvider<T> for SharedOptions<T> {
    fn resolve(&self) -> Rc<TableOptions<T>> {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_partial_json() {
        let settings: TableSettings =
            serde_json::from_value(serde_json::json!({ "manual_sorting": true })).unwrap();
        assert!(settings.manual_sorting);
        assert!(settings.enable_sorting);
        assert!(settings.paginate_expanded_rows);
        assert!(settings.keep_pinned_rows);
        assert_eq!(settings.max_leaf_row_filter_depth, 100);
        assert_eq!(settings.grouped_column_mode, GroupedColumnMode::Reorder);
    }

    #[test]
    fn test_debug_all_enables_every_area() {
        let settings = TableSettings {
            debug_all: true,
            ..Default::default()
        };
        assert!(settings.debug_rows_enabled());
        assert!(settings.debug_headers_enabled());
        assert!(settings.debug_columns_enabled());
        assert!(settings.debug_table_enabled());
    }
}
