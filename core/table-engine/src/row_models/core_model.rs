//! FILENAME: core/table-engine/src/row_models/core_model.rs
//! PURPOSE: Converts the source records into the row forest.
//! CONTEXT: Default ids are positional paths (`"0"`, `"0.1"`, `"0.1.3"`). A
//! custom row-id function receives the record, its index among its siblings
//! and the parent row id.

use std::rc::Rc;

use crate::column::ColumnTree;
use crate::options::{RowIdFn, SubRowsFn};
use crate::row::{Row, RowModel};
use crate::utils::PtrEq;
use crate::value::Record;

type RowIdKey<T> = Option<PtrEq<dyn Fn(&T, usize, Option<&str>) -> String>>;
type SubRowsKey<T> = Option<PtrEq<dyn Fn(&T, usize) -> Option<&[T]>>>;

/// Data identity, column identity (row caches hold column values), and the
/// identity of both accessors.
pub(crate) type CoreDeps<T> = (PtrEq<Vec<T>>, PtrEq<ColumnTree<T>>, RowIdKey<T>, SubRowsKey<T>);

pub fn build_core_row_model<T: Record>(
    data: &[T],
    row_id: Option<&RowIdFn<T>>,
    sub_rows: Option<&SubRowsFn<T>>,
) -> RowModel<T> {
    let rows = access_rows(data, 0, None, row_id, sub_rows);
    let model = RowModel::from_rows(rows);
    if model.rows_by_id.len() != model.flat_rows.len() {
        log::warn!(
            target: "table_engine::rows",
            "row id function produced duplicate ids: {} rows, {} distinct ids",
            model.flat_rows.len(),
            model.rows_by_id.len()
        );
    }
    model
}

fn access_rows<T: Record>(
    records: &[T],
    depth: usize,
    parent_id: Option<&str>,
    row_id: Option<&RowIdFn<T>>,
    sub_rows: Option<&SubRowsFn<T>>,
) -> Vec<Rc<Row<T>>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let id = match (row_id, parent_id) {
                (Some(f), _) => f(record, index, parent_id),
                (None, Some(parent)) => format!("{}.{}", parent, index),
                (None, None) => index.to_string(),
            };
            let children = match sub_rows.and_then(|f| f(record, index)) {
                Some(children) if !children.is_empty() => {
                    access_rows(children, depth + 1, Some(&id), row_id, sub_rows)
                }
                _ => Vec::new(),
            };
            Rc::new(Row::new(
                id,
                Rc::new(record.clone()),
                index,
                depth,
                children,
                parent_id.map(str::to_string),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value as Json};

    fn children(record: &Json, _: usize) -> Option<&[Json]> {
        record.get("children").and_then(|c| c.as_array()).map(|v| v.as_slice())
    }

    #[test]
    fn test_positional_ids_follow_the_tree() {
        let data = vec![
            json!({ "name": "Electronics", "children": [{ "name": "Phones" }, { "name": "Laptops" }] }),
            json!({ "name": "Clothing" }),
        ];
        let sub_rows: SubRowsFn<Json> = Rc::new(children);
        let model = build_core_row_model(&data, None, Some(&sub_rows));

        assert_eq!(model.row_ids(), vec!["0", "1"]);
        let flat: Vec<_> = model.flat_rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(flat, vec!["0", "0.0", "0.1", "1"]);
        let phones = &model.rows_by_id["0.0"];
        assert_eq!(phones.depth, 1);
        assert_eq!(phones.parent_id.as_deref(), Some("0"));
        assert_eq!(phones.index, 0);
    }

    #[test]
    fn test_custom_row_ids_receive_parent() {
        let data = vec![json!({ "key": "a", "children": [{ "key": "b" }] })];
        let row_id: RowIdFn<Json> = Rc::new(|record: &Json, _, parent: Option<&str>| {
            let key = record["key"].as_str().unwrap_or_default();
            match parent {
                Some(p) => format!("{}/{}", p, key),
                None => key.to_string(),
            }
        });
        let sub_rows: SubRowsFn<Json> = Rc::new(children);
        let model = build_core_row_model(&data, Some(&row_id), Some(&sub_rows));
        assert!(model.rows_by_id.contains_key("a/b"));
    }

    #[test]
    fn test_empty_data_builds_empty_model() {
        let model = build_core_row_model::<Json>(&[], None, None);
        assert!(model.is_empty());
        assert!(model.flat_rows.is_empty());
    }
}
