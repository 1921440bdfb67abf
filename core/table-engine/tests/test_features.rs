//! FILENAME: tests/test_features.rs
//! PURPOSE: Table features driven through the public surface: state
//! ownership, selection, pinning, column layout, sizing and faceting.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use serde_json::Value as Json;
use table_engine::prelude::*;
use table_engine::{
    ColumnFilter, ColumnPinPosition, ColumnPinningState, ColumnRegion, ColumnSort, PaginationState,
    PartialTableState, RowPinPosition, SharedOptions, SortingState, Table, TableError, TableOptions, TableSettings,
    TableState, Value, VirtualList,
};

fn column_ids(columns: &[table_engine::TableColumn<'_, Json>]) -> Vec<String> {
    columns.iter().map(|c| c.id.clone()).collect()
}

// ============================================================================
// STATE OWNERSHIP
// ============================================================================

#[test]
fn test_slice_callback_receives_value_and_store_is_untouched() {
    let seen: Rc<RefCell<Vec<SortingState>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut options = TableOptions::new(people(), people_columns());
    options.on_sorting_change = Some(Rc::new(move |sorting: &SortingState| {
        sink.borrow_mut().push(sorting.clone());
    }));
    let table = Table::from_options(options);

    table.set_sorting(vec![ColumnSort::asc("age")]);

    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0], vec![ColumnSort::asc("age")]);
    assert!(table.get_state().sorting.is_empty());
}

#[test]
fn test_controlled_slice_is_read_from_options() {
    let shared = SharedOptions::new(
        TableOptions::new(people(), people_columns())
            .with_pipeline(table_engine::RowModelPipeline::full()),
    );
    let table = Table::new(shared.clone());
    assert_eq!(visible_names(&table), vec!["Alice", "Bob", "Charlie"]);

    shared.update(|options| {
        options.with_state(PartialTableState {
            sorting: Some(vec![ColumnSort::desc("age")]),
            ..Default::default()
        })
    });
    assert_eq!(visible_names(&table), vec!["Charlie", "Alice", "Bob"]);

    // the controlled slice wins over anything written to the store
    table.set_sorting(vec![ColumnSort::asc("age")]);
    assert_eq!(visible_names(&table), vec!["Charlie", "Alice", "Bob"]);
}

#[test]
fn test_state_change_callback_sees_full_state() {
    let last: Rc<RefCell<Option<TableState>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&last);
    let options = TableOptions::new(people(), people_columns()).on_state_change(move |state: &TableState| {
        *sink.borrow_mut() = Some(state.clone());
    });
    let table = Table::from_options(options);

    table.set_global_filter(Value::from("bo"));
    let last = last.borrow();
    let state = last.as_ref().expect("callback ran");
    assert_eq!(state.global_filter, Value::from("bo"));
    assert_eq!(table.get_state().global_filter, Value::from("bo"));
}

#[test]
fn test_reset_restores_initial_state() {
    let options = TableOptions::new(people(), people_columns()).with_initial_state(PartialTableState {
        pagination: Some(PaginationState { page_index: 0, page_size: 2 }),
        ..Default::default()
    });
    let table = Table::from_options(options);
    assert_eq!(table.get_state().pagination.page_size, 2);

    table.set_column_filters(vec![ColumnFilter::new("team", "eng")]);
    table.set_page_index(1);
    table.reset();

    assert!(table.get_state().column_filters.is_empty());
    assert_eq!(table.get_state().pagination, PaginationState { page_index: 0, page_size: 2 });
}

#[test]
fn test_rejected_update_leaves_state_untouched() {
    let table = people_table(TableSettings::default());
    table.set_sorting(vec![ColumnSort::asc("name")]);

    let result = table.try_set_state(|state| {
        if state.pagination.page_size == 10 {
            return Err(TableError::UpdateRejected("page size is fixed".to_string()));
        }
        let mut next = state.clone();
        next.sorting.clear();
        Ok(next)
    });

    assert_eq!(result, Err(TableError::UpdateRejected("page size is fixed".to_string())));
    assert_eq!(table.get_state().sorting, vec![ColumnSort::asc("name")]);
}

#[test]
fn test_state_serializes_with_camel_case_keys() {
    let table = people_table(TableSettings::default());
    table.set_column_filters(vec![ColumnFilter::new("team", "eng")]);
    let json = serde_json::to_value(table.get_state()).unwrap();
    assert_eq!(json["columnFilters"][0]["id"], "team");
    assert!(json.get("rowSelection").is_some());

    let restored: TableState = serde_json::from_value(json).unwrap();
    assert_eq!(restored, table.get_state());
}

// ============================================================================
// ROW SELECTION
// ============================================================================

#[test]
fn test_selecting_parent_selects_descendants() {
    let table = catalog_table(TableSettings::default());
    table.get_row("0").unwrap().toggle_selected(Some(true), true);

    let selection = table.get_state().row_selection;
    let mut ids: Vec<&str> = selection.keys().map(String::as_str).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["0", "0.0", "0.1"]);

    let selected = table.get_selected_row_model();
    assert_eq!(selected.row_ids(), vec!["0"]);
    assert_eq!(selected.flat_rows.len(), 3);
    assert!(table.get_is_some_rows_selected());
    assert!(!table.get_is_all_rows_selected());
}

#[test]
fn test_selection_survives_filtering() {
    let table = people_table(TableSettings::default());
    table.get_row("1").unwrap().toggle_selected(Some(true), false);
    table.set_column_filters(vec![ColumnFilter::new("team", "eng")]);

    assert_eq!(table.get_filtered_selected_row_model().unwrap().len(), 0);
    assert_eq!(table.get_selected_row_model().len(), 1);
}

// ============================================================================
// ROW PINNING
// ============================================================================

#[test]
fn test_pinned_rows_leave_the_center() {
    let table = people_table(TableSettings::default());
    table.get_row("2").unwrap().pin(Some(RowPinPosition::Top), false, false);

    assert_eq!(names(&table.get_top_rows()), vec!["Charlie"]);
    assert_eq!(names(&table.get_center_rows()), vec!["Alice", "Bob"]);
    assert!(table.get_is_some_rows_pinned(Some(RowPinPosition::Top)));
    assert!(!table.get_is_some_rows_pinned(Some(RowPinPosition::Bottom)));
    assert_eq!(table.get_row("2").unwrap().get_pinned_index(), Some(0));
}

#[test]
fn test_kept_pinned_rows_stay_off_page() {
    let table = people_table(TableSettings {
        keep_pinned_rows: true,
        ..Default::default()
    });
    table.set_pagination(PaginationState { page_index: 0, page_size: 2 });
    table.get_row("2").unwrap().pin(Some(RowPinPosition::Bottom), false, false);

    assert_eq!(visible_names(&table), vec!["Alice", "Bob"]);
    assert_eq!(names(&table.get_bottom_rows()), vec!["Charlie"]);
}

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

#[test]
fn test_order_pinning_and_visibility_compose() {
    let table = people_table(TableSettings::default());
    table.set_column_order(vec!["team".to_string(), "name".to_string()]);
    table.get_column("age").unwrap().pin(Some(ColumnPinPosition::Left));
    table.get_column("name").unwrap().toggle_visibility(Some(false));

    assert_eq!(column_ids(&table.get_left_leaf_columns()), vec!["age"]);
    assert_eq!(column_ids(&table.get_center_leaf_columns()), vec!["team", "name"]);
    assert_eq!(column_ids(&table.get_visible_leaf_columns()), vec!["age", "team"]);

    let team = table.get_column("team").unwrap();
    assert_eq!(team.get_index(ColumnRegion::Center), Some(0));
    assert!(team.get_is_last_column(ColumnRegion::Center));

    let row = table.get_row("0").unwrap();
    let cells: Vec<String> = row.get_visible_cells().iter().map(|c| c.render_value()).collect();
    assert_eq!(cells, vec!["30", "eng"]);
}

#[test]
fn test_unpinning_restores_order() {
    let table = people_table(TableSettings::default());
    table.set_column_pinning(ColumnPinningState {
        left: vec![],
        right: vec!["name".to_string()],
    });
    assert_eq!(column_ids(&table.get_visible_leaf_columns()), vec!["age", "team", "name"]);

    table.get_column("name").unwrap().pin(None);
    assert_eq!(column_ids(&table.get_visible_leaf_columns()), vec!["name", "age", "team"]);
    assert!(!table.get_is_some_columns_pinned(None));
}

#[test]
fn test_hide_all_then_show_all() {
    let table = people_table(TableSettings::default());
    table.toggle_all_columns_visible(Some(false));
    assert!(table.get_visible_leaf_columns().is_empty());
    assert!(!table.get_is_some_columns_visible());

    table.toggle_all_columns_visible(Some(true));
    assert!(table.get_is_all_columns_visible());
}

// ============================================================================
// COLUMN SIZING
// ============================================================================

#[test]
fn test_drag_resize_commits_on_end() {
    let table = people_table(TableSettings::default());
    assert_eq!(table.get_total_size(), 450.0);

    let headers = table.get_leaf_headers();
    headers[0].begin_resize(100.0);
    assert!(table.get_column("name").unwrap().get_is_resizing());

    table.update_resize(175.0);
    assert_eq!(table.get_column("name").unwrap().get_size(), 150.0);

    table.end_resize(175.0);
    let name = table.get_column("name").unwrap();
    assert_eq!(name.get_size(), 225.0);
    assert!(!name.get_is_resizing());
    assert_eq!(table.get_column("age").unwrap().get_start(ColumnRegion::All), 225.0);
    assert_eq!(table.get_total_size(), 525.0);
}

// ============================================================================
// FACETING
// ============================================================================

#[test]
fn test_team_facet_ignores_its_own_filter() {
    let table = people_table(TableSettings::default());
    table.set_column_filters(vec![
        ColumnFilter::new("team", "eng"),
        ColumnFilter::new("age", Value::from(vec![0, 32])),
    ]);
    assert_eq!(visible_names(&table), vec!["Alice"]);

    let team = table.get_column("team").unwrap();
    let counts = team.get_faceted_unique_values().unwrap();
    assert_eq!(counts.get(&Value::from("eng")), Some(&1));
    assert_eq!(counts.get(&Value::from("ops")), Some(&1));

    let age = table.get_column("age").unwrap();
    assert_eq!(age.get_faceted_min_max_values().unwrap(), Some((30.0, 35.0)));
}

// ============================================================================
// VIRTUALIZATION
// ============================================================================

#[test]
fn test_virtual_window_over_the_row_model() {
    let table = catalog_table(TableSettings::default());
    table.toggle_all_rows_expanded(Some(true));
    let model = table.get_row_model().unwrap();

    let list = VirtualList::new(model.len(), 20.0).with_overscan(0);
    let window = list.visible_range(25.0, 30.0);
    assert_eq!(window, 1..3);
    assert_eq!(names(&table.wrap_rows(&model.rows[window])), vec!["Phones", "Laptops"]);
}
