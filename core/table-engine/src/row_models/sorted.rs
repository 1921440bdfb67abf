//! FILENAME: core/table-engine/src/row_models/sorted.rs
//! PURPOSE: Multi-column stable sort, applied recursively to sub-rows.
//! CONTEXT: Sorting entries are tie-breakers evaluated left to right; rows
//! that compare equal on every entry keep their source order (`Row::index`).

use std::cmp::Ordering;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::column::{ColumnTree, SortUndefined};
use crate::error::TableResult;
use crate::features::sorting_fns::SortingFn;
use crate::features::{ColumnSorting, Feature};
use crate::row::{Row, RowModel, TableRow};
use crate::state::SortingState;
use crate::table::Table;
use crate::utils::PtrEq;
use crate::value::Record;

use super::ModelRef;

pub(crate) type SortDeps<T> = (PtrEq<ColumnTree<T>>, SortingState, bool);

pub(crate) fn run<T: Record>(table: &Table<T>, input: ModelRef<T>) -> TableResult<ModelRef<T>> {
    let options = table.options();
    if options.settings.manual_sorting {
        return Ok(input);
    }
    let enabled = table.has_feature(Feature::RowSorting) && options.settings.enable_sorting;
    let sorting = if enabled {
        table.get_state().sorting
    } else {
        Vec::new()
    };
    let deps: SortDeps<T> = (PtrEq::new(options.columns.tree()), sorting, enabled);
    table.memos.pipeline.sorted.try_get(
        (PtrEq(input), deps),
        options.settings.debug_rows_enabled(),
        |(input, (_, sorting, _))| sort_model(table, &input.0, sorting),
    )
}

struct ResolvedSort<T> {
    id: String,
    desc: bool,
    invert: bool,
    sort_undefined: SortUndefined,
    sorting_fn: SortingFn<T>,
}

fn sort_model<T: Record>(table: &Table<T>, input: &ModelRef<T>, sorting: &SortingState) -> TableResult<ModelRef<T>> {
    if input.rows.is_empty() || sorting.is_empty() {
        return Ok(Rc::clone(input));
    }

    let mut entries: SmallVec<[ResolvedSort<T>; 4]> = SmallVec::new();
    for sort in sorting {
        let Some(column) = table.get_column(&sort.id) else {
            log::warn!(target: "table_engine::sorting", "ignoring sort on unknown column '{}'", sort.id);
            continue;
        };
        if !column.get_can_sort() {
            continue;
        }
        entries.push(ResolvedSort {
            id: sort.id.clone(),
            desc: sort.desc,
            invert: column.def.invert_sorting,
            sort_undefined: column.def.sort_undefined,
            sorting_fn: column.get_sorting_fn()?,
        });
    }
    if entries.is_empty() {
        return Ok(Rc::clone(input));
    }

    let rows = sort_level(table, &input.rows, &entries);
    Ok(Rc::new(RowModel::from_rows(rows)))
}

fn sort_level<T: Record>(table: &Table<T>, rows: &[Rc<Row<T>>], entries: &[ResolvedSort<T>]) -> Vec<Rc<Row<T>>> {
    let mut handles = table.wrap_rows(rows);
    handles.sort_by(|a, b| compare_rows(a, b, entries));
    handles
        .into_iter()
        .map(|handle| {
            let row = handle.row;
            if row.sub_rows.is_empty() {
                row
            } else {
                Rc::new(row.with_sub_rows(sort_level(table, &row.sub_rows, entries)))
            }
        })
        .collect()
}

fn compare_rows<T: Record>(a: &TableRow<'_, T>, b: &TableRow<'_, T>, entries: &[ResolvedSort<T>]) -> Ordering {
    for entry in entries {
        if entry.sort_undefined != SortUndefined::Default {
            let a_empty = a.get_value(&entry.id).is_empty();
            let b_empty = b.get_value(&entry.id).is_empty();
            let empty_first = entry.sort_undefined == SortUndefined::First;
            match (a_empty, b_empty) {
                (true, true) => continue,
                (true, false) => return if empty_first { Ordering::Less } else { Ordering::Greater },
                (false, true) => return if empty_first { Ordering::Greater } else { Ordering::Less },
                (false, false) => {}
            }
        }

        let mut ord = entry.sorting_fn.compare(a, b, &entry.id);
        if ord != Ordering::Equal {
            if entry.desc {
                ord = ord.reverse();
            }
            if entry.invert {
                ord = ord.reverse();
            }
            return ord;
        }
    }
    a.index.cmp(&b.index)
}
