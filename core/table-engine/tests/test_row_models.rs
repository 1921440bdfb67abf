//! FILENAME: tests/test_row_models.rs
//! PURPOSE: Properties of the row model pipeline, checked end to end.

mod common;

use std::rc::Rc;

use common::*;
use serde_json::{json, Value as Json};
use table_engine::prelude::*;
use table_engine::{
    ColumnDef, ColumnDefs, ColumnFilter, ColumnSort, ExpandedState, PaginationState, RowModelPipeline, Stage,
    Table, TableOptions, TableSettings, Value,
};

// ============================================================================
// CORE MODEL
// ============================================================================

#[test]
fn test_row_ids_are_unique_and_flat_rows_count_every_node() {
    let table = catalog_table(TableSettings::default());
    let core = table.get_core_row_model();

    assert_eq!(core.rows.len(), 2);
    assert_eq!(core.flat_rows.len(), 4);
    assert_eq!(core.rows_by_id.len(), core.flat_rows.len());
    assert_eq!(core.row_ids(), vec!["0", "1"]);
}

#[test]
fn test_child_depth_is_parent_depth_plus_one() {
    let table = catalog_table(TableSettings::default());
    let core = table.get_core_row_model();
    for row in &core.flat_rows {
        match row.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = &core.rows_by_id[parent_id];
                assert_eq!(row.depth, parent.depth + 1);
                assert!(parent.sub_rows.iter().any(|child| child.id == row.id));
            }
            None => assert_eq!(row.depth, 0),
        }
    }
}

#[test]
fn test_custom_row_ids() {
    let options = TableOptions::new(people(), people_columns())
        .with_row_id(|record: &Json, _, _| record["name"].as_str().unwrap_or_default().to_lowercase());
    let table = Table::from_options(options);
    assert_eq!(table.get_core_row_model().row_ids(), vec!["alice", "bob", "charlie"]);
    assert_eq!(table.get_row("bob").unwrap().get_value("age"), Value::from(25));
}

// ============================================================================
// FILTERING
// ============================================================================

#[test]
fn test_filter_from_root_drops_non_matching_parents() {
    let table = catalog_table(TableSettings::default());
    table.set_column_filters(vec![ColumnFilter::new("name", "phones")]);
    let filtered = table.get_filtered_row_model().unwrap();
    assert!(filtered.rows.is_empty());
}

#[test]
fn test_filter_from_root_keeps_matching_parent_whole() {
    let table = catalog_table(TableSettings::default());
    table.set_column_filters(vec![ColumnFilter::new("name", "Electronics")]);
    let filtered = table.get_filtered_row_model().unwrap();

    assert_eq!(filtered.row_ids(), vec!["0"]);
    let child_ids: Vec<&str> = filtered.rows[0].sub_rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(child_ids, vec!["0.0", "0.1"]);
    assert!(filtered.rows_by_id.contains_key("0.0"));
    assert!(filtered.rows_by_id.contains_key("0.1"));
    assert_eq!(filtered.flat_rows.len(), 3);
}

#[test]
fn test_filter_from_leaf_rows_keeps_ancestors_of_matches() {
    let table = catalog_table(TableSettings {
        filter_from_leaf_rows: true,
        ..Default::default()
    });
    table.set_column_filters(vec![ColumnFilter::new("name", "phones")]);
    let filtered = table.get_filtered_row_model().unwrap();

    assert_eq!(filtered.row_ids(), vec!["0"]);
    assert_eq!(filtered.rows[0].sub_rows.len(), 1);
    assert_eq!(filtered.rows[0].sub_rows[0].id, "0.0");
    assert_eq!(filtered.flat_rows.len(), 2);
}

#[test]
fn test_global_filter_matches_any_column() {
    let table = people_table(TableSettings::default());
    table.set_global_filter(Value::from("ops"));
    assert_eq!(visible_names(&table), vec!["Bob"]);

    table.set_global_filter(Value::from("3"));
    assert_eq!(visible_names(&table), vec!["Alice", "Charlie"]);
}

#[test]
fn test_number_range_filter() {
    let table = people_table(TableSettings::default());
    table.get_column("age").unwrap().set_filter_value(Value::from(vec![26, 40]));
    assert_eq!(visible_names(&table), vec!["Alice", "Charlie"]);
}

// ============================================================================
// SORTING
// ============================================================================

#[test]
fn test_sort_is_stable_for_equal_keys() {
    let columns = ColumnDefs::new(vec![ColumnDef::accessor("name"), ColumnDef::accessor("rank")]).unwrap();
    let data = vec![
        json!({ "name": "x", "rank": 1 }),
        json!({ "name": "y", "rank": 0 }),
        json!({ "name": "z", "rank": 1 }),
        json!({ "name": "w", "rank": 0 }),
    ];
    let table = Table::from_options(TableOptions::new(data, columns).with_pipeline(RowModelPipeline::new().with_sorted()));
    table.set_sorting(vec![ColumnSort::asc("rank")]);
    assert_eq!(visible_names(&table), vec!["y", "w", "x", "z"]);

    table.set_sorting(vec![ColumnSort::desc("rank")]);
    assert_eq!(visible_names(&table), vec!["x", "z", "y", "w"]);
}

#[test]
fn test_multi_sort_breaks_ties_left_to_right() {
    let table = people_table(TableSettings::default());
    table.set_sorting(vec![ColumnSort::asc("team"), ColumnSort::desc("age")]);
    assert_eq!(visible_names(&table), vec!["Charlie", "Alice", "Bob"]);
}

#[test]
fn test_sub_rows_sort_recursively() {
    let table = catalog_table(TableSettings::default());
    table.set_sorting(vec![ColumnSort::asc("name")]);
    table.set_expanded(ExpandedState::All);
    let model = table.get_row_model().unwrap();
    let names = names(&table.wrap_rows(&model.rows));
    assert_eq!(names, vec!["Clothing", "Electronics", "Laptops", "Phones"]);
}

// ============================================================================
// GROUPING
// ============================================================================

#[test]
fn test_grouping_builds_group_rows_with_aggregates() {
    let table = people_table(TableSettings::default());
    table.set_grouping(vec!["team".to_string()]);
    let model = table.get_grouped_row_model().unwrap();

    assert_eq!(model.row_ids(), vec!["team:eng", "team:ops"]);
    let eng = table.row_handle(Rc::clone(&model.rows[0]));
    assert_eq!(eng.get_value("age"), Value::from(65));
    assert_eq!(eng.sub_rows.len(), 2);
    assert_eq!(eng.leaf_rows.len(), 2);
    assert!(RowGrouping::get_is_grouped(&eng));
}

// ============================================================================
// EXPANDING
// ============================================================================

#[test]
fn test_expanding_one_row_inserts_its_children_in_order() {
    let table = catalog_table(TableSettings::default());
    table.get_row("0").unwrap().toggle_expanded(Some(true));
    assert_eq!(visible_names(&table), vec!["Electronics", "Phones", "Laptops", "Clothing"]);
}

#[test]
fn test_expanding_all_lists_the_forest_depth_first() {
    let table = catalog_table(TableSettings::default());
    table.toggle_all_rows_expanded(Some(true));
    assert_eq!(table.get_expanded_row_model().unwrap().len(), 4);
    table.toggle_all_rows_expanded(Some(false));
    assert_eq!(visible_names(&table), vec!["Electronics", "Clothing"]);
}

// ============================================================================
// PAGINATION
// ============================================================================

#[test]
fn test_pages_slice_the_upstream_rows() {
    let table = people_table(TableSettings::default());
    table.set_pagination(PaginationState { page_index: 0, page_size: 2 });
    assert_eq!(visible_names(&table), vec!["Alice", "Bob"]);

    table.next_page();
    assert_eq!(visible_names(&table), vec!["Charlie"]);

    table.set_page_index(5);
    assert!(visible_names(&table).is_empty());
}

#[test]
fn test_manual_pagination_returns_every_row() {
    let table = people_table(TableSettings {
        manual_pagination: true,
        ..Default::default()
    });
    table.set_pagination(PaginationState { page_index: 1, page_size: 1 });
    assert_eq!(table.get_row_model().unwrap().len(), 3);
}

// ============================================================================
// PIPELINE COMPOSITION AND MEMOIZATION
// ============================================================================

#[test]
fn test_unconfigured_stage_getters_pass_through() {
    let options = TableOptions::new(people(), people_columns()).with_pipeline(RowModelPipeline::new().with_filtered());
    let table = Table::from_options(options);
    let filtered = table.get_filtered_row_model().unwrap();
    let sorted = table.get_sorted_row_model().unwrap();
    assert!(Rc::ptr_eq(&filtered, &sorted));
}

#[test]
fn test_sorting_leaves_the_filtered_model_cached() {
    let table = people_table(TableSettings::default());
    table.set_column_filters(vec![ColumnFilter::new("team", "eng")]);
    let filtered = table.get_filtered_row_model().unwrap();

    table.set_sorting(vec![ColumnSort::desc("age")]);
    assert!(Rc::ptr_eq(&filtered, &table.get_filtered_row_model().unwrap()));

    table.set_column_filters(vec![ColumnFilter::new("team", "ops")]);
    assert!(!Rc::ptr_eq(&filtered, &table.get_filtered_row_model().unwrap()));
}

#[test]
fn test_caller_chosen_stage_order() {
    let pipeline = RowModelPipeline::ordered([Stage::Paginated, Stage::Sorted]);
    let options = TableOptions::new(people(), people_columns()).with_pipeline(pipeline);
    let table = Table::from_options(options);
    table.set_pagination(PaginationState { page_index: 0, page_size: 2 });
    table.set_sorting(vec![ColumnSort::desc("age")]);
    // the page is cut first, then sorted
    assert_eq!(visible_names(&table), vec!["Alice", "Bob"]);
}

#[test]
fn test_row_models_are_memoized_until_state_changes() {
    let table = people_table(TableSettings::default());
    let first = table.get_row_model().unwrap();
    let second = table.get_row_model().unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    table.set_sorting(vec![ColumnSort::desc("age")]);
    let third = table.get_row_model().unwrap();
    assert!(!Rc::ptr_eq(&first, &third));
}

