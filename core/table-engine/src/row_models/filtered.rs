//! FILENAME: core/table-engine/src/row_models/filtered.rs
//! PURPOSE: Applies column filters and the global filter.
//! CONTEXT: Every flat row of the input gets a pass flag per active filter
//! (plus `GLOBAL_FILTER_ID`) in its shared cache. The forest is then pruned
//! with one of two hierarchical strategies:
//! - from root (default): a matching row is kept with all of its children
//! - from leaf rows: a row is kept if it matches or any descendant matches,
//!   down to `max_leaf_row_filter_depth`

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::column::ColumnTree;
use crate::error::TableResult;
use crate::features::filter_fns::FilterFn;
use crate::features::filtering::GLOBAL_FILTER_ID;
use crate::features::{ColumnFiltering, Feature};
use crate::row::{Row, RowModel};
use crate::state::ColumnFiltersState;
use crate::table::Table;
use crate::utils::PtrEq;
use crate::value::{Record, Value};

use super::ModelRef;

/// Feature and settings switches the stage reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FilterSwitches {
    column_filters: bool,
    global_filter: bool,
    from_leaf_rows: bool,
    max_depth: usize,
}

impl FilterSwitches {
    pub(crate) fn of<T: Record>(table: &Table<T>) -> Self {
        let settings = &table.options().settings;
        FilterSwitches {
            column_filters: table.has_feature(Feature::ColumnFiltering),
            global_filter: table.has_feature(Feature::GlobalFiltering),
            from_leaf_rows: settings.filter_from_leaf_rows,
            max_depth: settings.max_leaf_row_filter_depth,
        }
    }
}

pub(crate) type FilterDeps<T> = (PtrEq<ColumnTree<T>>, ColumnFiltersState, Value, FilterSwitches);

pub(crate) fn run<T: Record>(table: &Table<T>, input: ModelRef<T>) -> TableResult<ModelRef<T>> {
    let options = table.options();
    if options.settings.manual_filtering {
        return Ok(input);
    }
    let state = table.get_state();
    let deps: FilterDeps<T> = (
        PtrEq::new(options.columns.tree()),
        state.column_filters,
        state.global_filter,
        FilterSwitches::of(table),
    );
    table.memos.pipeline.filtered.try_get(
        (PtrEq(input), deps),
        options.settings.debug_rows_enabled(),
        |(input, (_, filters, global, switches))| filter_model(table, &input.0, filters, global, switches),
    )
}

struct ResolvedFilter<T> {
    id: String,
    filter_fn: FilterFn<T>,
    value: Value,
}

fn filter_model<T: Record>(
    table: &Table<T>,
    input: &ModelRef<T>,
    filters: &ColumnFiltersState,
    global: &Value,
    switches: &FilterSwitches,
) -> TableResult<ModelRef<T>> {
    let filters: &[_] = if switches.column_filters { filters.as_slice() } else { &[] };
    let global_active = switches.global_filter && global.is_truthy();

    if input.rows.is_empty() || (filters.is_empty() && !global_active) {
        for row in &input.flat_rows {
            row.cache.column_filters.borrow_mut().clear();
            row.cache.column_filters_meta.borrow_mut().clear();
        }
        return Ok(Rc::clone(input));
    }

    let mut resolved = Vec::with_capacity(filters.len());
    for filter in filters {
        let Some(column) = table.get_column(&filter.id) else {
            log::warn!(
                target: "table_engine::filtering",
                "ignoring filter on unknown column '{}'",
                filter.id
            );
            continue;
        };
        let filter_fn = column.get_filter_fn()?;
        let value = filter_fn.resolve_filter_value(&filter.value);
        resolved.push(ResolvedFilter {
            id: filter.id.clone(),
            filter_fn,
            value,
        });
    }

    let mut filterable_ids: Vec<String> = filters.iter().map(|f| f.id.clone()).collect();

    let mut resolved_global = Vec::new();
    if global_active {
        let global_fn = table.get_global_filter_fn()?;
        let value = global_fn.resolve_filter_value(global);
        for column in table.get_all_leaf_columns() {
            if column.get_can_global_filter() {
                resolved_global.push(ResolvedFilter {
                    id: column.id.clone(),
                    filter_fn: global_fn.clone(),
                    value: value.clone(),
                });
            }
        }
        if !resolved_global.is_empty() {
            filterable_ids.push(GLOBAL_FILTER_ID.to_string());
        }
    }

    for row in &input.flat_rows {
        let handle = table.row_handle(Rc::clone(row));
        let mut flags = FxHashMap::default();
        let mut metas = FxHashMap::default();

        for filter in &resolved {
            let mut meta = Value::Empty;
            let pass = filter.filter_fn.test(&handle, &filter.id, &filter.value, &mut meta);
            flags.insert(filter.id.clone(), pass);
            if !meta.is_empty() {
                metas.insert(filter.id.clone(), meta);
            }
        }

        if !resolved_global.is_empty() {
            let mut any = false;
            for filter in &resolved_global {
                let mut meta = Value::Empty;
                let pass = filter.filter_fn.test(&handle, &filter.id, &filter.value, &mut meta);
                if !meta.is_empty() {
                    metas.insert(filter.id.clone(), meta);
                }
                if pass {
                    any = true;
                    break;
                }
            }
            flags.insert(GLOBAL_FILTER_ID.to_string(), any);
        }

        *row.cache.column_filters.borrow_mut() = flags;
        *row.cache.column_filters_meta.borrow_mut() = metas;
    }

    let passes = |row: &Rc<Row<T>>| {
        let flags = row.cache.column_filters.borrow();
        filterable_ids.iter().all(|id| flags.get(id) != Some(&false))
    };
    Ok(Rc::new(filter_rows(table, &input.rows, &passes)))
}

/// Prunes a forest with the table's hierarchical filter strategy.
pub(crate) fn filter_rows<T: Record>(
    table: &Table<T>,
    rows: &[Rc<Row<T>>],
    passes: &dyn Fn(&Rc<Row<T>>) -> bool,
) -> RowModel<T> {
    let settings = &table.options().settings;
    let max_depth = settings.max_leaf_row_filter_depth;
    let kept = if settings.filter_from_leaf_rows {
        from_leaf_rows(rows, passes, 0, max_depth)
    } else {
        from_root_rows(rows, passes)
    };
    RowModel::from_rows(kept)
}

fn from_root_rows<T>(rows: &[Rc<Row<T>>], passes: &dyn Fn(&Rc<Row<T>>) -> bool) -> Vec<Rc<Row<T>>> {
    rows.iter().filter(|row| passes(row)).cloned().collect()
}

fn from_leaf_rows<T>(
    rows: &[Rc<Row<T>>],
    passes: &dyn Fn(&Rc<Row<T>>) -> bool,
    depth: usize,
    max_depth: usize,
) -> Vec<Rc<Row<T>>> {
    let mut out = Vec::new();
    for row in rows {
        if !row.sub_rows.is_empty() && depth < max_depth {
            let children = from_leaf_rows(&row.sub_rows, passes, depth + 1, max_depth);
            if passes(row) || !children.is_empty() {
                out.push(Rc::new(row.with_sub_rows(children)));
            }
        } else if passes(row) {
            out.push(Rc::new(row.with_sub_rows(Vec::new())));
        }
    }
    out
}

/// Flag lookup used by faceting: passes every filter except `skip`.
pub(crate) fn passes_except<T>(row: &Rc<Row<T>>, ids: &[String], skip: Option<&str>) -> bool {
    let flags = row.cache.column_filters.borrow();
    ids.iter()
        .filter(|id| Some(id.as_str()) != skip)
        .all(|id| flags.get(id) != Some(&false))
}
