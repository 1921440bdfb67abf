//! FILENAME: core/table-engine/src/state.rs
//! Table State - The canonical record of independently evolvable slices.
//!
//! These structures are designed to be:
//! - Serializable (so controlled state can cross a UI or process boundary)
//! - Cheap to compare (memo cells key on slice values)
//! - Replaced wholesale on update, never mutated in place

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

// ============================================================================
// SORTING / FILTERING / GROUPING
// ============================================================================

/// One entry of the sorting list. Entries are evaluated left to right as tie-breakers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSort {
    pub id: String,
    pub desc: bool,
}

impl ColumnSort {
    pub fn asc(id: impl Into<String>) -> Self {
        ColumnSort { id: id.into(), desc: false }
    }

    pub fn desc(id: impl Into<String>) -> Self {
        ColumnSort { id: id.into(), desc: true }
    }
}

pub type SortingState = Vec<ColumnSort>;

/// An active per-column filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub id: String,
    pub value: Value,
}

impl ColumnFilter {
    pub fn new(id: impl Into<String>, value: impl Into<Value>) -> Self {
        ColumnFilter {
            id: id.into(),
            value: value.into(),
        }
    }
}

pub type ColumnFiltersState = Vec<ColumnFilter>;

/// Ordered list of group-by column ids.
pub type GroupingState = Vec<String>;

// ============================================================================
// EXPANDING
// ============================================================================

/// Either every row is expanded, or an explicit row-id map.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpandedState {
    All,
    Rows(BTreeMap<String, bool>),
}

impl ExpandedState {
    /// True when nothing is marked expanded.
    pub fn is_empty(&self) -> bool {
        match self {
            ExpandedState::All => false,
            ExpandedState::Rows(rows) => rows.is_empty(),
        }
    }

    /// Explicit map entry for a row, `None` when the row is not mentioned.
    pub fn get(&self, row_id: &str) -> Option<bool> {
        match self {
            ExpandedState::All => Some(true),
            ExpandedState::Rows(rows) => rows.get(row_id).copied(),
        }
    }
}

impl Default for ExpandedState {
    fn default() -> Self {
        ExpandedState::Rows(BTreeMap::new())
    }
}

impl Serialize for ExpandedState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExpandedState::All => serializer.serialize_bool(true),
            ExpandedState::Rows(rows) => rows.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ExpandedState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Rows(BTreeMap<String, bool>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => ExpandedState::All,
            Repr::Flag(false) => ExpandedState::default(),
            Repr::Rows(rows) => ExpandedState::Rows(rows),
        })
    }
}

// ============================================================================
// PAGINATION / SELECTION / PINNING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
}

pub const DEFAULT_PAGE_INDEX: usize = 0;
pub const DEFAULT_PAGE_SIZE: usize = 10;

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState {
            page_index: DEFAULT_PAGE_INDEX,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Row id -> selected. Absent ids are unselected.
pub type RowSelectionState = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowPinningState {
    pub top: Vec<String>,
    pub bottom: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnPinningState {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

// ============================================================================
// SIZING / VISIBILITY / ORDER
// ============================================================================

/// Column id -> width override.
pub type ColumnSizingState = BTreeMap<String, f64>;

/// Transient drag-resize bookkeeping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSizingInfoState {
    pub start_offset: Option<f64>,
    pub start_size: Option<f64>,
    pub delta_offset: Option<f64>,
    pub delta_percentage: Option<f64>,
    /// Id of the header column being dragged.
    pub is_resizing_column: Option<String>,
    /// Leaf column sizes captured when the drag began.
    pub column_sizing_start: Vec<(String, f64)>,
}

/// Column id -> visible. Absent ids are visible.
pub type VisibilityState = BTreeMap<String, bool>;

pub type ColumnOrderState = Vec<String>;

// ============================================================================
// TABLE STATE
// ============================================================================

/// The complete state of one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableState {
    pub sorting: SortingState,
    pub column_filters: ColumnFiltersState,
    pub global_filter: Value,
    pub grouping: GroupingState,
    pub expanded: ExpandedState,
    pub pagination: PaginationState,
    pub row_selection: RowSelectionState,
    pub row_pinning: RowPinningState,
    pub column_pinning: ColumnPinningState,
    pub column_sizing: ColumnSizingState,
    pub column_sizing_info: ColumnSizingInfoState,
    pub column_visibility: VisibilityState,
    pub column_order: ColumnOrderState,
}

/// A sparse table state: `Some` slices override, `None` slices are left alone.
///
/// Used both for controlled state (`TableOptions::state`, the caller owns
/// every `Some` slice) and for initial-state overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialTableState {
    pub sorting: Option<SortingState>,
    pub column_filters: Option<ColumnFiltersState>,
    pub global_filter: Option<Value>,
    pub grouping: Option<GroupingState>,
    pub expanded: Option<ExpandedState>,
    pub pagination: Option<PaginationState>,
    pub row_selection: Option<RowSelectionState>,
    pub row_pinning: Option<RowPinningState>,
    pub column_pinning: Option<ColumnPinningState>,
    pub column_sizing: Option<ColumnSizingState>,
    pub column_sizing_info: Option<ColumnSizingInfoState>,
    pub column_visibility: Option<VisibilityState>,
    pub column_order: Option<ColumnOrderState>,
}

impl PartialTableState {
    /// Copies every `Some` slice over `state`.
    pub fn apply_to(&self, state: &mut TableState) {
        fn put<S: Clone>(slot: &mut S, value: &Option<S>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        put(&mut state.sorting, &self.sorting);
        put(&mut state.column_filters, &self.column_filters);
        put(&mut state.global_filter, &self.global_filter);
        put(&mut state.grouping, &self.grouping);
        put(&mut state.expanded, &self.expanded);
        put(&mut state.pagination, &self.pagination);
        put(&mut state.row_selection, &self.row_selection);
        put(&mut state.row_pinning, &self.row_pinning);
        put(&mut state.column_pinning, &self.column_pinning);
        put(&mut state.column_sizing, &self.column_sizing);
        put(&mut state.column_sizing_info, &self.column_sizing_info);
        put(&mut state.column_visibility, &self.column_visibility);
        put(&mut state.column_order, &self.column_order);
    }

    /// Writes the slices of `next` that this partial state does NOT control into `store`.
    pub fn assign_uncontrolled(&self, store: &mut TableState, next: &TableState) {
        fn take<S: Clone, C>(slot: &mut S, next: &S, controlled: &Option<C>) {
            if controlled.is_none() {
                *slot = next.clone();
            }
        }

        take(&mut store.sorting, &next.sorting, &self.sorting);
        take(&mut store.column_filters, &next.column_filters, &self.column_filters);
        take(&mut store.global_filter, &next.global_filter, &self.global_filter);
        take(&mut store.grouping, &next.grouping, &self.grouping);
        take(&mut store.expanded, &next.expanded, &self.expanded);
        take(&mut store.pagination, &next.pagination, &self.pagination);
        take(&mut store.row_selection, &next.row_selection, &self.row_selection);
        take(&mut store.row_pinning, &next.row_pinning, &self.row_pinning);
        take(&mut store.column_pinning, &next.column_pinning, &self.column_pinning);
        take(&mut store.column_sizing, &next.column_sizing, &self.column_sizing);
        take(&mut store.column_sizing_info, &next.column_sizing_info, &self.column_sizing_info);
        take(&mut store.column_visibility, &next.column_visibility, &self.column_visibility);
        take(&mut store.column_order, &next.column_order, &self.column_order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_state_serializes_all_as_true() {
        let json = serde_json::to_value(ExpandedState::All).unwrap();
        assert_eq!(json, serde_json::json!(true));

        let parsed: ExpandedState = serde_json::from_value(serde_json::json!({ "0": true })).unwrap();
        assert_eq!(parsed.get("0"), Some(true));
        assert_eq!(parsed.get("1"), None);
    }

    #[test]
    fn test_table_state_round_trips_with_defaults() {
        let parsed: TableState =
            serde_json::from_value(serde_json::json!({ "sorting": [{ "id": "age", "desc": true }] })).unwrap();
        assert_eq!(parsed.sorting, vec![ColumnSort::desc("age")]);
        assert_eq!(parsed.pagination, PaginationState::default());
        assert!(parsed.expanded.is_empty());
    }

    #[test]
    fn test_assign_uncontrolled_skips_controlled_slices() {
        let controlled = PartialTableState {
            sorting: Some(vec![ColumnSort::asc("name")]),
            ..Default::default()
        };
        let mut store = TableState::default();
        let next = TableState {
            sorting: vec![ColumnSort::desc("age")],
            grouping: vec!["team".to_string()],
            ..Default::default()
        };

        controlled.assign_uncontrolled(&mut store, &next);
        assert!(store.sorting.is_empty());
        assert_eq!(store.grouping, vec!["team".to_string()]);
    }
}
