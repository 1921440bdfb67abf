//! FILENAME: core/table-engine/src/lib.rs
//! PURPOSE: Main library entry point for the headless table engine.
//! CONTEXT: Given records and column definitions, a `Table` derives columns,
//! header groups and a memoized row model pipeline (filtered, grouped,
//! sorted, expanded, paginated), plus selection, pinning, sizing, visibility,
//! ordering and faceting. Nothing here renders; a presentation layer reads
//! the derived models and calls the feature setters.
//!
//! Feature capabilities on columns, rows, cells and headers are traits.
//! `use table_engine::prelude::*` brings all of them into scope.

pub mod cell;
pub mod column;
pub mod error;
pub mod features;
pub mod header;
pub mod options;
pub mod row;
pub mod row_models;
pub mod state;
pub mod table;
pub mod utils;
pub mod value;

// Re-export commonly used types at the crate root
pub use cell::TableCell;
pub use column::{
    Accessor, Column, ColumnDef, ColumnDefs, FnRef, SortUndefined, TableColumn, DEFAULT_COLUMN_MAX_SIZE,
    DEFAULT_COLUMN_MIN_SIZE, DEFAULT_COLUMN_SIZE,
};
pub use error::{TableError, TableResult};
pub use features::aggregation_fns::AggregationFn;
pub use features::filter_fns::FilterFn;
pub use features::sorting_fns::SortingFn;
pub use features::{
    ColumnPinPosition, FacetCounts, Feature, RowPinPosition, ScrollAlign, SelectionState, SortDirection,
    VirtualItem, VirtualList, GLOBAL_FILTER_ID,
};
pub use header::{ColumnRegion, Header, HeaderGroup, TableHeader};
pub use options::{
    ColumnResizeDirection, ColumnResizeMode, GroupedColumnMode, OnChange, OptionsProvider, SharedOptions,
    TableOptions, TableSettings,
};
pub use row::{Row, RowModel, TableRow};
pub use row_models::{RowModelPipeline, Stage};
pub use state::{
    ColumnFilter, ColumnFiltersState, ColumnOrderState, ColumnPinningState, ColumnSizingInfoState,
    ColumnSizingState, ColumnSort, ExpandedState, GroupingState, PaginationState, PartialTableState,
    RowPinningState, RowSelectionState, SortingState, TableState, VisibilityState,
};
pub use table::{HeaderGroups, Table};
pub use utils::{functional_update, Memo, Updater};
pub use value::{Record, Value};

/// Every capability trait, for glob import.
pub mod prelude {
    pub use crate::features::{
        CellGrouping, ColumnFaceting, ColumnFiltering, ColumnGrouping, ColumnOrdering, ColumnPinning,
        ColumnSizing, ColumnSorting, ColumnVisibility, HeaderSizing, RowExpanding, RowGrouping, RowPinning,
        RowSelection,
    };
}
