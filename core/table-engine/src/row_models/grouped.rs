//! FILENAME: core/table-engine/src/row_models/grouped.rs
//! PURPOSE: Partitions rows into synthetic group rows, one level per grouping column.
//! CONTEXT: Groups appear in first-seen order. A group row's id is
//! `columnId:value` (prefixed with `parentId>` below the top level), its
//! `original` is the first member's record, and its values for non-grouped
//! columns come from the column's aggregation function, resolved lazily
//! through `TableRow::get_value`.
//!
//! Data rows end up beneath the innermost groups as relocated copies (new
//! depth and parent, same cache), so the source model is never mutated.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::column::ColumnTree;
use crate::error::TableResult;
use crate::features::grouping::grouping_value_of;
use crate::features::{ColumnGrouping, Feature};
use crate::row::{Row, RowModel};
use crate::state::GroupingState;
use crate::table::Table;
use crate::utils::PtrEq;
use crate::value::{Record, Value};

use super::ModelRef;

pub(crate) type GroupDeps<T> = (PtrEq<ColumnTree<T>>, GroupingState, bool);

pub(crate) fn run<T: Record>(table: &Table<T>, input: ModelRef<T>) -> TableResult<ModelRef<T>> {
    let options = table.options();
    if options.settings.manual_grouping {
        return Ok(input);
    }
    let enabled = table.has_feature(Feature::ColumnGrouping);
    let grouping = if enabled {
        table.get_state().grouping
    } else {
        Vec::new()
    };
    let deps: GroupDeps<T> = (PtrEq::new(options.columns.tree()), grouping, enabled);
    table.memos.pipeline.grouped.try_get(
        (PtrEq(input), deps),
        options.settings.debug_rows_enabled(),
        |(input, (_, grouping, _))| group_model(table, &input.0, grouping),
    )
}

fn group_model<T: Record>(
    table: &Table<T>,
    input: &ModelRef<T>,
    grouping: &GroupingState,
) -> TableResult<ModelRef<T>> {
    if input.rows.is_empty() || grouping.is_empty() {
        return Ok(Rc::clone(input));
    }

    let existing: Vec<String> = grouping
        .iter()
        .filter(|id| {
            let known = table.get_column(id).is_some();
            if !known {
                log::warn!(target: "table_engine::grouping", "ignoring grouping by unknown column '{}'", id);
            }
            known
        })
        .cloned()
        .collect();
    if existing.is_empty() {
        return Ok(Rc::clone(input));
    }

    // Surface unknown aggregation names before any row is built.
    for column in table.get_all_leaf_columns() {
        if !existing.contains(&column.id) {
            column.get_aggregation_fn()?;
        }
    }

    let existing: Rc<[String]> = Rc::from(existing);
    let rows = group_level(table, &input.rows, &existing, 0, None);
    Ok(Rc::new(RowModel::from_rows(rows)))
}

fn group_level<T: Record>(
    table: &Table<T>,
    rows: &[Rc<Row<T>>],
    grouping: &Rc<[String]>,
    depth: usize,
    parent_id: Option<&str>,
) -> Vec<Rc<Row<T>>> {
    let Some(column_id) = grouping.get(depth) else {
        return rows.iter().map(|row| relocate(row, depth, parent_id)).collect();
    };

    let mut buckets: Vec<(String, Value, Vec<Rc<Row<T>>>)> = Vec::new();
    let mut bucket_of: FxHashMap<String, usize> = FxHashMap::default();
    for row in rows {
        let value = grouping_value_of(table, row, column_id);
        let key = value.to_string();
        match bucket_of.get(&key) {
            Some(&at) => buckets[at].2.push(Rc::clone(row)),
            None => {
                bucket_of.insert(key.clone(), buckets.len());
                buckets.push((key, value, vec![Rc::clone(row)]));
            }
        }
    }

    let innermost = depth + 1 >= grouping.len();
    buckets
        .into_iter()
        .enumerate()
        .filter_map(|(index, (key, value, members))| {
            let original = Rc::clone(&members.first()?.original);
            let local_id = format!("{}:{}", column_id, key);
            let id = match parent_id {
                Some(parent) => format!("{}>{}", parent, local_id),
                None => local_id,
            };
            let sub_rows = group_level(table, &members, grouping, depth + 1, Some(&id));
            let leaf_rows = if innermost {
                sub_rows.clone()
            } else {
                sub_rows.iter().flat_map(|group| group.leaf_rows.iter().cloned()).collect()
            };

            let mut group = Row::new(id, original, index, depth, sub_rows, parent_id.map(str::to_string));
            group.grouping_column_id = Some(column_id.clone());
            group.grouping_value = value;
            group.leaf_rows = leaf_rows;
            group.grouped_column_ids = Rc::clone(grouping);
            Some(Rc::new(group))
        })
        .collect()
}

/// Moves a data row (and its descendants) beneath a group.
fn relocate<T>(row: &Rc<Row<T>>, depth: usize, parent_id: Option<&str>) -> Rc<Row<T>> {
    let children = row
        .sub_rows
        .iter()
        .map(|child| relocate(child, depth + 1, Some(&row.id)))
        .collect();
    Rc::new(row.relocated(depth, parent_id.map(str::to_string), children))
}
