//! FILENAME: tests/common/mod.rs
//! Fixtures shared by the table-engine integration tests.

#![allow(dead_code)]

use serde_json::{json, Value as Json};
use table_engine::{ColumnDef, ColumnDefs, RowModelPipeline, Table, TableOptions, TableRow, TableSettings};

/// Name, age and team of three people.
pub fn people() -> Vec<Json> {
    vec![
        json!({ "name": "Alice", "age": 30, "team": "eng" }),
        json!({ "name": "Bob", "age": 25, "team": "ops" }),
        json!({ "name": "Charlie", "age": 35, "team": "eng" }),
    ]
}

pub fn people_columns() -> ColumnDefs<Json> {
    ColumnDefs::new(vec![
        ColumnDef::accessor("name"),
        ColumnDef::accessor("age"),
        ColumnDef::accessor("team"),
    ])
    .expect("valid people columns")
}

/// Electronics -> [Phones, Laptops], Clothing.
pub fn catalog() -> Vec<Json> {
    vec![
        json!({ "name": "Electronics", "children": [{ "name": "Phones" }, { "name": "Laptops" }] }),
        json!({ "name": "Clothing" }),
    ]
}

pub fn catalog_columns() -> ColumnDefs<Json> {
    ColumnDefs::new(vec![ColumnDef::accessor("name")]).expect("valid catalog columns")
}

pub fn children(record: &Json, _: usize) -> Option<&[Json]> {
    record.get("children").and_then(|c| c.as_array()).map(|v| v.as_slice())
}

/// People through the full pipeline.
pub fn people_table(settings: TableSettings) -> Table<Json> {
    let options = TableOptions::new(people(), people_columns())
        .with_settings(settings)
        .with_pipeline(RowModelPipeline::full());
    Table::from_options(options)
}

/// The catalog hierarchy through the full pipeline.
pub fn catalog_table(settings: TableSettings) -> Table<Json> {
    let options = TableOptions::new(catalog(), catalog_columns())
        .with_sub_rows(children)
        .with_settings(settings)
        .with_pipeline(RowModelPipeline::full());
    Table::from_options(options)
}

/// The `name` cell of every row, rendered.
pub fn names(rows: &[TableRow<'_, Json>]) -> Vec<String> {
    rows.iter().map(|row| row.render_value("name")).collect()
}

/// The `name` cell of every top-level row of the final row model.
pub fn visible_names(table: &Table<Json>) -> Vec<String> {
    let model = table.get_row_model().expect("row model");
    names(&table.wrap_rows(&model.rows))
}
