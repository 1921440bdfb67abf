//! FILENAME: core/table-engine/src/features/mod.rs
//! Table features.
//!
//! Each feature adds a state slice, inherent operations on `Table`, and a
//! capability trait implemented on the handle it extends:
//! - column traits: `ColumnSorting`, `ColumnFiltering`, `ColumnGrouping`,
//!   `ColumnFaceting`, `ColumnPinning`, `ColumnSizing`, `ColumnVisibility`,
//!   `ColumnOrdering`
//! - row traits: `RowExpanding`, `RowSelection`, `RowPinning`, `RowGrouping`
//! - cell and header traits: `CellGrouping`, `HeaderSizing`
//!
//! A feature left out of `TableOptions::features` keeps its state slice but
//! its capabilities answer "cannot" and its stage (if any) passes rows through.

use serde::{Deserialize, Serialize};

pub mod aggregation_fns;
pub mod filter_fns;
pub mod sorting_fns;

pub mod column_ordering;
pub mod column_pinning;
pub mod column_sizing;
pub mod column_visibility;
pub mod expanding;
pub mod faceting;
pub mod filtering;
pub mod grouping;
pub mod pagination;
pub mod row_pinning;
pub mod row_selection;
pub mod sorting;
pub mod virtualization;

pub use column_ordering::ColumnOrdering;
pub use column_pinning::{ColumnPinPosition, ColumnPinning};
pub use column_sizing::{ColumnSizing, HeaderSizing};
pub use column_visibility::ColumnVisibility;
pub use expanding::RowExpanding;
pub use faceting::{ColumnFaceting, FacetCounts};
pub use filtering::{ColumnFiltering, GLOBAL_FILTER_ID};
pub use grouping::{CellGrouping, ColumnGrouping, RowGrouping};
pub use row_pinning::{RowPinPosition, RowPinning};
pub use row_selection::{RowSelection, SelectionState};
pub use sorting::{ColumnSorting, SortDirection};
pub use virtualization::{ScrollAlign, VirtualItem, VirtualList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    ColumnVisibility,
    ColumnOrdering,
    ColumnPinning,
    ColumnFaceting,
    ColumnFiltering,
    GlobalFiltering,
    RowSorting,
    ColumnGrouping,
    RowExpanding,
    RowPagination,
    RowPinning,
    RowSelection,
    ColumnSizing,
}

impl Feature {
    /// The default feature set, in installation order.
    pub const ALL: [Feature; 13] = [
        Feature::ColumnVisibility,
        Feature::ColumnOrdering,
        Feature::ColumnPinning,
        Feature::ColumnFaceting,
        Feature::ColumnFiltering,
        Feature::GlobalFiltering,
        Feature::RowSorting,
        Feature::ColumnGrouping,
        Feature::RowExpanding,
        Feature::RowPagination,
        Feature::RowPinning,
        Feature::RowSelection,
        Feature::ColumnSizing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::ColumnVisibility => "column-visibility",
            Feature::ColumnOrdering => "column-ordering",
            Feature::ColumnPinning => "column-pinning",
            Feature::ColumnFaceting => "column-faceting",
            Feature::ColumnFiltering => "column-filtering",
            Feature::GlobalFiltering => "global-filtering",
            Feature::RowSorting => "row-sorting",
            Feature::ColumnGrouping => "column-grouping",
            Feature::RowExpanding => "row-expanding",
            Feature::RowPagination => "row-pagination",
            Feature::RowPinning => "row-pinning",
            Feature::RowSelection => "row-selection",
            Feature::ColumnSizing => "column-sizing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_are_unique() {
        let mut names: Vec<_> = Feature::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Feature::ALL.len());
    }
}
