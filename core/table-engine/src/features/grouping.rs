//! FILENAME: core/table-engine/src/features/grouping.rs
//! PURPOSE: Grouping state, the grouping capabilities of columns, rows and cells,
//! and aggregated values of group rows.
//! CONTEXT: Within a group row, a cell is exactly one of grouped (the column
//! this row groups by), placeholder (another grouped column) or aggregated
//! (any other column of a row with children).

use std::rc::Rc;

use crate::cell::TableCell;
use crate::column::{lookup_named, FnRef, TableColumn};
use crate::error::{TableError, TableResult};
use crate::features::aggregation_fns::{self, AggregationFn};
use crate::features::Feature;
use crate::row::{Row, TableRow};
use crate::state::{GroupingState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::{Record, Value};

/// The key a row is grouped under for `column_id`: the column's custom
/// grouping value when it defines one, the cell value otherwise.
pub(crate) fn grouping_value_of<T: Record>(table: &Table<T>, row: &Rc<Row<T>>, column_id: &str) -> Value {
    if let Some(value) = row.cache.grouping_values.borrow().get(column_id) {
        return value.clone();
    }
    let custom = table.column_rc(column_id).and_then(|c| c.def.grouping_value.clone());
    let value = match custom {
        Some(f) => f(&row.original),
        None => table.row_handle(Rc::clone(row)).get_value(column_id),
    };
    row.cache
        .grouping_values
        .borrow_mut()
        .insert(column_id.to_string(), value.clone());
    value
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    pub fn set_grouping(&self, updater: impl Into<Updater<GroupingState>>) {
        self.update_slice(updater.into(), |s| &mut s.grouping, |o| o.on_grouping_change.as_ref());
    }

    pub fn reset_grouping(&self, default: bool) {
        let next = if default {
            TableState::default().grouping
        } else {
            self.initial_state().grouping.clone()
        };
        self.set_grouping(next);
    }

    /// Aggregated value of a non-grouped column for a group row.
    pub(crate) fn aggregate_group_value(&self, row: &Rc<Row<T>>, column_id: &str) -> Value {
        let Some(column) = self.get_column(column_id) else {
            return Value::Empty;
        };
        let aggregation_fn = match column.get_aggregation_fn() {
            Ok(Some(f)) => f,
            Ok(None) => return Value::Empty,
            Err(err) => {
                log::warn!(target: "table_engine::grouping", "{}", err);
                return Value::Empty;
            }
        };
        let leaf_rows = self.wrap_rows(&row.leaf_rows);
        let child_rows = self.wrap_rows(&row.sub_rows);
        aggregation_fn.aggregate(column_id, &leaf_rows, &child_rows)
    }
}

// ============================================================================
// COLUMN CAPABILITY
// ============================================================================

pub trait ColumnGrouping<T: Record> {
    fn toggle_grouping(&self);
    fn get_can_group(&self) -> bool;
    fn get_is_grouped(&self) -> bool;
    fn get_grouped_index(&self) -> Option<usize>;
    /// Sum for numbers, extent for dates, nothing for other kinds.
    fn get_auto_aggregation_fn(&self) -> Option<AggregationFn<T>>;
    /// `Ok(None)` when the column is not aggregated.
    fn get_aggregation_fn(&self) -> TableResult<Option<AggregationFn<T>>>;
}

impl<'t, T: Record> ColumnGrouping<T> for TableColumn<'t, T> {
    fn toggle_grouping(&self) {
        let column_id = self.column.id.clone();
        self.table.set_grouping(Updater::with(move |old: &GroupingState| {
            if old.contains(&column_id) {
                old.iter().filter(|id| **id != column_id).cloned().collect()
            } else {
                let mut next = old.clone();
                next.push(column_id);
                next
            }
        }));
    }

    fn get_can_group(&self) -> bool {
        self.table.has_feature(Feature::ColumnGrouping)
            && self.column.def.enable_grouping.unwrap_or(true)
            && self.table.options().settings.enable_grouping
            && (self.column.has_accessor() || self.column.def.grouping_value.is_some())
    }

    fn get_is_grouped(&self) -> bool {
        self.get_grouped_index().is_some()
    }

    fn get_grouped_index(&self) -> Option<usize> {
        self.table.get_state().grouping.iter().position(|id| *id == self.column.id)
    }

    fn get_auto_aggregation_fn(&self) -> Option<AggregationFn<T>> {
        aggregation_fns::auto_name_for(&self.first_core_value()).and_then(aggregation_fns::builtin)
    }

    fn get_aggregation_fn(&self) -> TableResult<Option<AggregationFn<T>>> {
        match &self.column.def.aggregation_fn {
            FnRef::Auto => Ok(self.get_auto_aggregation_fn()),
            FnRef::Custom(f) => Ok(Some(f.clone())),
            FnRef::Named(name) => {
                let options = self.table.options();
                lookup_named(name, &options.aggregation_fns, aggregation_fns::builtin)
                    .map(Some)
                    .ok_or_else(|| TableError::UnknownAggregationFn {
                        column_id: self.column.id.clone(),
                        name: name.clone(),
                    })
            }
        }
    }
}

// ============================================================================
// ROW AND CELL CAPABILITIES
// ============================================================================

pub trait RowGrouping {
    /// True for group rows.
    fn get_is_grouped(&self) -> bool;
    fn get_grouping_value(&self, column_id: &str) -> Value;
}

impl<'t, T: Record> RowGrouping for TableRow<'t, T> {
    fn get_is_grouped(&self) -> bool {
        self.row.is_group_row()
    }

    fn get_grouping_value(&self, column_id: &str) -> Value {
        grouping_value_of(self.table, &self.row, column_id)
    }
}

pub trait CellGrouping {
    /// The cell of the column its group row groups by.
    fn get_is_grouped(&self) -> bool;
    /// A grouped column's cell in a row grouped by some other column.
    fn get_is_placeholder(&self) -> bool;
    /// A non-grouped column's cell in a row with children.
    fn get_is_aggregated(&self) -> bool;
}

impl<'t, T: Record> TableCell<'t, T> {
    fn column_is_grouped(&self) -> bool {
        self.table.get_state().grouping.contains(&self.column.id)
    }
}

impl<'t, T: Record> CellGrouping for TableCell<'t, T> {
    fn get_is_grouped(&self) -> bool {
        self.column_is_grouped() && self.row.grouping_column_id.as_deref() == Some(self.column.id.as_str())
    }

    fn get_is_placeholder(&self) -> bool {
        !self.get_is_grouped() && self.column_is_grouped()
    }

    fn get_is_aggregated(&self) -> bool {
        !self.get_is_grouped() && !self.get_is_placeholder() && !self.row.sub_rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::options::TableOptions;
    use crate::row_models::RowModelPipeline;
    use serde_json::{json, Value as Json};

    fn table() -> Table<Json> {
        let columns = ColumnDefs::new(vec![
            ColumnDef::accessor("team"),
            ColumnDef::accessor("name"),
            ColumnDef::accessor("score"),
            ColumnDef::accessor("initial").grouping_value(|r: &Json| {
                Value::from(r["name"].as_str().and_then(|s| s.get(..1)).unwrap_or(""))
            }),
        ])
        .unwrap();
        let data = vec![
            json!({ "team": "red", "name": "Ann", "score": 3 }),
            json!({ "team": "blue", "name": "Ben", "score": 5 }),
            json!({ "team": "red", "name": "Cid", "score": 4 }),
        ];
        Table::from_options(TableOptions::new(data, columns).with_pipeline(RowModelPipeline::new().with_grouped()))
    }

    #[test]
    fn test_toggle_grouping_appends_and_removes() {
        let table = table();
        let team = table.get_column("team").unwrap();
        team.toggle_grouping();
        table.get_column("name").unwrap().toggle_grouping();
        assert_eq!(table.get_state().grouping, vec!["team".to_string(), "name".to_string()]);
        assert_eq!(team.get_grouped_index(), Some(0));
        team.toggle_grouping();
        assert_eq!(table.get_state().grouping, vec!["name".to_string()]);
        assert!(!team.get_is_grouped());
    }

    #[test]
    fn test_group_rows_aggregate_other_columns() {
        let table = table();
        table.set_grouping(vec!["team".to_string()]);
        let model = table.get_grouped_row_model().unwrap();
        assert_eq!(model.row_ids(), vec!["team:red", "team:blue"]);

        let red = table.row_handle(Rc::clone(&model.rows[0]));
        assert!(RowGrouping::get_is_grouped(&red));
        assert_eq!(red.get_value("score"), Value::from(7));
        assert_eq!(red.get_value("team"), Value::from("red"));
        assert_eq!(red.get_grouping_value("team"), Value::from("red"));
    }

    #[test]
    fn test_cell_roles_in_group_rows() {
        let table = table();
        table.set_grouping(vec!["team".to_string(), "name".to_string()]);
        let model = table.get_grouped_row_model().unwrap();
        let red = table.row_handle(Rc::clone(&model.rows[0]));
        let cells = red.get_all_cells();
        let role = |id: &str| {
            let cell = cells.iter().find(|c| c.column_id() == id).unwrap();
            (cell.get_is_grouped(), cell.get_is_placeholder(), cell.get_is_aggregated())
        };
        assert_eq!(role("team"), (true, false, false));
        assert_eq!(role("name"), (false, true, false));
        assert_eq!(role("score"), (false, false, true));
    }

    #[test]
    fn test_custom_grouping_value() {
        let table = table();
        table.set_grouping(vec!["initial".to_string()]);
        let model = table.get_grouped_row_model().unwrap();
        assert_eq!(model.row_ids(), vec!["initial:A", "initial:B", "initial:C"]);
        assert!(table.get_column("initial").unwrap().get_can_group());
    }

    #[test]
    fn test_unknown_aggregation_fn_fails_the_stage() {
        let columns = ColumnDefs::new(vec![
            ColumnDef::accessor("team"),
            ColumnDef::accessor("score").aggregation_fn("total"),
        ])
        .unwrap();
        let options = TableOptions::new(vec![json!({ "team": "a", "score": 1 })], columns)
            .with_pipeline(RowModelPipeline::new().with_grouped());
        let table: Table<Json> = Table::from_options(options);
        table.set_grouping(vec!["team".to_string()]);
        assert_eq!(
            table.get_grouped_row_model().unwrap_err(),
            TableError::UnknownAggregationFn {
                column_id: "score".to_string(),
                name: "total".to_string()
            }
        );
    }
}
