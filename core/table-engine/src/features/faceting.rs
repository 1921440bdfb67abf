//! FILENAME: core/table-engine/src/features/faceting.rs
//! PURPOSE: Per-column facets (the rows a column's filter UI should count,
//! their unique values and their numeric range).
//! CONTEXT: A column's faceted rows are the pre-filtered rows filtered by
//! every active filter except the column's own, so a facet does not shrink
//! while its own filter is being edited. The pass flags are the ones the
//! filtered stage wrote into the row caches, which is why every facet
//! depends on the filtered model.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::column::TableColumn;
use crate::error::TableResult;
use crate::features::filtering::GLOBAL_FILTER_ID;
use crate::features::{ColumnFiltering, Feature};
use crate::row::{Row, RowModel};
use crate::row_models::filtered::{filter_rows, passes_except};
use crate::state::ColumnFiltersState;
use crate::table::Table;
use crate::utils::{Memo, PtrEq};
use crate::value::{Record, Value};

/// Unique value -> number of faceted rows holding it.
pub type FacetCounts = Rc<FxHashMap<Value, usize>>;

type ModelRef<T> = Rc<RowModel<T>>;
type FacetDeps<T> = (PtrEq<RowModel<T>>, ColumnFiltersState, Value, PtrEq<RowModel<T>>);
type ModelMemo<T> = Rc<Memo<FacetDeps<T>, ModelRef<T>>>;
type CountsMemo<T> = Rc<Memo<PtrEq<RowModel<T>>, FacetCounts>>;
type RangeMemo<T> = Rc<Memo<PtrEq<RowModel<T>>, Option<(f64, f64)>>>;

/// Memo cells keyed by column id (`GLOBAL_FILTER_ID` for the global facet),
/// created on first use.
pub(crate) struct FacetMemos<T> {
    models: RefCell<FxHashMap<String, ModelMemo<T>>>,
    unique_values: RefCell<FxHashMap<String, CountsMemo<T>>>,
    min_max_values: RefCell<FxHashMap<String, RangeMemo<T>>>,
}

impl<T> FacetMemos<T> {
    pub(crate) fn new() -> Self {
        FacetMemos {
            models: RefCell::new(FxHashMap::default()),
            unique_values: RefCell::new(FxHashMap::default()),
            min_max_values: RefCell::new(FxHashMap::default()),
        }
    }
}

/// Returns the cell for `key`, creating it on first use. The map is not
/// borrowed once this returns.
fn memo_for<D: PartialEq, O: Clone>(
    cells: &RefCell<FxHashMap<String, Rc<Memo<D, O>>>>,
    key: &str,
    name: &'static str,
) -> Rc<Memo<D, O>> {
    let mut cells = cells.borrow_mut();
    Rc::clone(cells.entry(key.to_string()).or_insert_with(|| Rc::new(Memo::new(name))))
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    /// Rows passing every active filter except `skip`.
    fn faceted_model(&self, key: &str, skip: &str) -> TableResult<ModelRef<T>> {
        let pre_filtered = self.get_pre_filtered_row_model()?;
        if !self.has_feature(Feature::ColumnFaceting) {
            return Ok(pre_filtered);
        }
        let filtered = self.get_filtered_row_model()?;
        let state = self.get_state();
        let deps = (PtrEq(pre_filtered), state.column_filters, state.global_filter, PtrEq(filtered));
        let memo = memo_for(&self.memos.facets.models, key, "getFacetedRowModel");
        let debug = self.options().settings.debug_rows_enabled();
        Ok(memo.get_logged(deps, debug, |(pre, filters, global, _)| {
            if pre.0.rows.is_empty() || (filters.is_empty() && !global.is_truthy()) {
                return Rc::clone(&pre.0);
            }
            let mut ids: Vec<String> = filters.iter().map(|f| f.id.clone()).collect();
            if global.is_truthy() {
                ids.push(GLOBAL_FILTER_ID.to_string());
            }
            let passes = |row: &Rc<Row<T>>| passes_except(row, &ids, Some(skip));
            Rc::new(filter_rows(self, &pre.0.rows, &passes))
        }))
    }

    fn facet_counts(&self, key: &str, model: ModelRef<T>, column_ids: &[String]) -> FacetCounts {
        let memo = memo_for(&self.memos.facets.unique_values, key, "getFacetedUniqueValues");
        let debug = self.options().settings.debug_rows_enabled();
        memo.get_logged(PtrEq(model), debug, |model| {
            let mut counts: FxHashMap<Value, usize> = FxHashMap::default();
            for row in &model.0.flat_rows {
                let row = self.row_handle(Rc::clone(row));
                for column_id in column_ids {
                    for value in row.get_unique_values(column_id) {
                        *counts.entry(value).or_insert(0) += 1;
                    }
                }
            }
            Rc::new(counts)
        })
    }

    fn facet_range(&self, key: &str, model: ModelRef<T>, column_ids: &[String]) -> Option<(f64, f64)> {
        let memo = memo_for(&self.memos.facets.min_max_values, key, "getFacetedMinMaxValues");
        let debug = self.options().settings.debug_rows_enabled();
        memo.get_logged(PtrEq(model), debug, |model| {
            let mut range: Option<(f64, f64)> = None;
            for row in &model.0.flat_rows {
                let row = self.row_handle(Rc::clone(row));
                for column_id in column_ids {
                    for n in row.get_unique_values(column_id).iter().filter_map(Value::as_f64) {
                        range = Some(match range {
                            Some((min, max)) => (min.min(n), max.max(n)),
                            None => (n, n),
                        });
                    }
                }
            }
            range
        })
    }

    /// Columns the global filter searches.
    fn global_facet_columns(&self) -> Vec<String> {
        self.get_all_leaf_columns()
            .into_iter()
            .filter(|c| c.get_can_global_filter())
            .map(|c| c.id.clone())
            .collect()
    }

    /// Rows passing every column filter, ignoring the global filter.
    pub fn get_global_faceted_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.faceted_model(GLOBAL_FILTER_ID, GLOBAL_FILTER_ID)
    }

    /// Value counts across every globally filterable column.
    pub fn get_global_faceted_unique_values(&self) -> TableResult<FacetCounts> {
        let model = self.get_global_faceted_row_model()?;
        Ok(self.facet_counts(GLOBAL_FILTER_ID, model, &self.global_facet_columns()))
    }

    /// Numeric range across every globally filterable column.
    pub fn get_global_faceted_min_max_values(&self) -> TableResult<Option<(f64, f64)>> {
        let model = self.get_global_faceted_row_model()?;
        Ok(self.facet_range(GLOBAL_FILTER_ID, model, &self.global_facet_columns()))
    }
}

// ============================================================================
// COLUMN CAPABILITY
// ============================================================================

pub trait ColumnFaceting<T: Record> {
    fn get_faceted_row_model(&self) -> TableResult<Rc<RowModel<T>>>;
    fn get_faceted_unique_values(&self) -> TableResult<FacetCounts>;
    /// `None` when no faceted row holds a number.
    fn get_faceted_min_max_values(&self) -> TableResult<Option<(f64, f64)>>;
}

impl<'t, T: Record> ColumnFaceting<T> for TableColumn<'t, T> {
    fn get_faceted_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.table.faceted_model(&self.column.id, &self.column.id)
    }

    fn get_faceted_unique_values(&self) -> TableResult<FacetCounts> {
        let model = self.get_faceted_row_model()?;
        Ok(self.table.facet_counts(&self.column.id, model, &[self.column.id.clone()]))
    }

    fn get_faceted_min_max_values(&self) -> TableResult<Option<(f64, f64)>> {
        let model = self.get_faceted_row_model()?;
        Ok(self.table.facet_range(&self.column.id, model, &[self.column.id.clone()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::options::TableOptions;
    use crate::row_models::RowModelPipeline;
    use crate::state::ColumnFilter;
    use serde_json::{json, Value as Json};

    fn table() -> Table<Json> {
        let columns = ColumnDefs::new(vec![
            ColumnDef::accessor("team"),
            ColumnDef::accessor("score"),
        ])
        .unwrap();
        let data = vec![
            json!({ "team": "red", "score": 3 }),
            json!({ "team": "blue", "score": 5 }),
            json!({ "team": "red", "score": 8 }),
            json!({ "team": "green", "score": 1 }),
        ];
        Table::from_options(TableOptions::new(data, columns).with_pipeline(RowModelPipeline::new().with_filtered()))
    }

    #[test]
    fn test_own_filter_does_not_shrink_facet() {
        let table = table();
        table.set_column_filters(vec![ColumnFilter::new("team", "red")]);
        assert_eq!(table.get_row_model().unwrap().len(), 2);

        let team = table.get_column("team").unwrap();
        let counts = team.get_faceted_unique_values().unwrap();
        assert_eq!(counts.get(&Value::from("red")), Some(&2));
        assert_eq!(counts.get(&Value::from("blue")), Some(&1));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_other_filters_shrink_facet() {
        let table = table();
        table.set_column_filters(vec![ColumnFilter::new("team", "red")]);
        let score = table.get_column("score").unwrap();
        assert_eq!(score.get_faceted_row_model().unwrap().len(), 2);
        assert_eq!(score.get_faceted_min_max_values().unwrap(), Some((3.0, 8.0)));

        table.reset_column_filters(true);
        assert_eq!(score.get_faceted_min_max_values().unwrap(), Some((1.0, 8.0)));
    }

    #[test]
    fn test_facets_are_memoized() {
        let table = table();
        let team = table.get_column("team").unwrap();
        let first = team.get_faceted_unique_values().unwrap();
        let second = team.get_faceted_unique_values().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_global_facet_ignores_global_filter() {
        let table = table();
        table.set_global_filter(Value::from("blue"));
        assert_eq!(table.get_row_model().unwrap().len(), 1);
        assert_eq!(table.get_global_faceted_row_model().unwrap().len(), 4);
        let counts = table.get_global_faceted_unique_values().unwrap();
        assert_eq!(counts.get(&Value::from("red")), Some(&2));
        assert_eq!(table.get_global_faceted_min_max_values().unwrap(), Some((1.0, 8.0)));
    }
}
