//! FILENAME: core/table-engine/src/features/filtering.rs
//! PURPOSE: Column filter and global filter state, plus the column filtering capability.
//! CONTEXT: A filter value that its function's `auto_remove` rejects (or an
//! empty value) removes the entry instead of being stored, so the state only
//! ever lists filters that actually constrain rows.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::column::{lookup_named, FnRef, TableColumn};
use crate::error::{TableError, TableResult};
use crate::features::filter_fns::{self, FilterFn};
use crate::features::Feature;
use crate::state::{ColumnFilter, ColumnFiltersState, TableState};
use crate::table::Table;
use crate::utils::{functional_update, Updater};
use crate::value::{Record, Value};

/// Flag key the global filter writes into each row's `column_filters`.
pub const GLOBAL_FILTER_ID: &str = "__global__";

fn should_auto_remove<T: Record>(filter_fn: Option<&FilterFn<T>>, value: &Value) -> bool {
    filter_fn.map(|f| f.should_auto_remove(value)).unwrap_or(false) || filter_fns::test_falsey(value)
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    /// Replaces the column filters. Entries whose value their column's filter
    /// function would auto-remove are dropped.
    pub fn set_column_filters(&self, updater: impl Into<Updater<ColumnFiltersState>>) {
        let updater = updater.into();
        let filter_fns: FxHashMap<String, Option<FilterFn<T>>> = self
            .get_all_leaf_columns()
            .into_iter()
            .map(|column| (column.id.clone(), column.get_filter_fn().ok()))
            .collect();
        let strip = Updater::with(move |old: &ColumnFiltersState| {
            functional_update(updater, old)
                .into_iter()
                .filter(|filter| match filter_fns.get(&filter.id) {
                    Some(filter_fn) => !should_auto_remove(filter_fn.as_ref(), &filter.value),
                    None => true,
                })
                .collect()
        });
        self.update_slice(strip, |s| &mut s.column_filters, |o| o.on_column_filters_change.as_ref());
    }

    pub fn reset_column_filters(&self, default: bool) {
        let next = if default {
            TableState::default().column_filters
        } else {
            self.initial_state().column_filters.clone()
        };
        self.set_column_filters(next);
    }

    pub fn set_global_filter(&self, updater: impl Into<Updater<Value>>) {
        self.update_slice(updater.into(), |s| &mut s.global_filter, |o| o.on_global_filter_change.as_ref());
    }

    pub fn reset_global_filter(&self, default: bool) {
        let next = if default {
            TableState::default().global_filter
        } else {
            self.initial_state().global_filter.clone()
        };
        self.set_global_filter(next);
    }

    pub fn get_global_auto_filter_fn(&self) -> FilterFn<T> {
        filter_fns::includes_string()
    }

    /// The function the global filter runs against every globally filterable column.
    pub fn get_global_filter_fn(&self) -> TableResult<FilterFn<T>> {
        let options = self.options();
        match &options.global_filter_fn {
            FnRef::Auto => Ok(self.get_global_auto_filter_fn()),
            FnRef::Custom(f) => Ok(f.clone()),
            FnRef::Named(name) => lookup_named(name, &options.filter_fns, filter_fns::builtin)
                .ok_or_else(|| TableError::UnknownGlobalFilterFn(name.clone())),
        }
    }
}

// ============================================================================
// COLUMN CAPABILITY
// ============================================================================

pub trait ColumnFiltering<T: Record> {
    /// Filter function inferred from the first core row's value.
    fn get_auto_filter_fn(&self) -> FilterFn<T>;
    fn get_filter_fn(&self) -> TableResult<FilterFn<T>>;
    fn get_can_filter(&self) -> bool;
    /// Enabled, has an accessor, and the first core row holds text or a number.
    fn get_can_global_filter(&self) -> bool;
    fn get_is_filtered(&self) -> bool;
    fn get_filter_value(&self) -> Option<Value>;
    fn get_filter_index(&self) -> Option<usize>;
    fn set_filter_value(&self, value: impl Into<Value>);
    /// Derives the next filter value from the current one (`Empty` when unset).
    fn update_filter_value(&self, f: impl FnOnce(&Value) -> Value + 'static);
}

impl<'t, T: Record> TableColumn<'t, T> {
    pub(crate) fn first_core_value(&self) -> Value {
        let core = self.table.get_core_row_model();
        match core.flat_rows.first() {
            Some(row) => self.table.row_handle(Rc::clone(row)).get_value(&self.column.id),
            None => Value::Empty,
        }
    }
}

impl<'t, T: Record> ColumnFiltering<T> for TableColumn<'t, T> {
    fn get_auto_filter_fn(&self) -> FilterFn<T> {
        let name = filter_fns::auto_name_for(&self.first_core_value());
        filter_fns::builtin(name).unwrap_or_else(filter_fns::weak_equals)
    }

    fn get_filter_fn(&self) -> TableResult<FilterFn<T>> {
        match &self.column.def.filter_fn {
            FnRef::Auto => Ok(self.get_auto_filter_fn()),
            FnRef::Custom(f) => Ok(f.clone()),
            FnRef::Named(name) => {
                let options = self.table.options();
                lookup_named(name, &options.filter_fns, filter_fns::builtin).ok_or_else(|| {
                    TableError::UnknownFilterFn {
                        column_id: self.column.id.clone(),
                        name: name.clone(),
                    }
                })
            }
        }
    }

    fn get_can_filter(&self) -> bool {
        let settings = &self.table.options().settings;
        self.table.has_feature(Feature::ColumnFiltering)
            && self.column.def.enable_column_filter.unwrap_or(true)
            && settings.enable_column_filters
            && settings.enable_filters
            && self.column.has_accessor()
    }

    fn get_can_global_filter(&self) -> bool {
        let settings = &self.table.options().settings;
        self.table.has_feature(Feature::GlobalFiltering)
            && self.column.def.enable_global_filter.unwrap_or(true)
            && settings.enable_global_filter
            && settings.enable_filters
            && self.column.has_accessor()
            && matches!(self.first_core_value(), Value::Text(_) | Value::Number(_))
    }

    fn get_is_filtered(&self) -> bool {
        self.get_filter_index().is_some()
    }

    fn get_filter_value(&self) -> Option<Value> {
        self.table
            .get_state()
            .column_filters
            .into_iter()
            .find(|f| f.id == self.column.id)
            .map(|f| f.value)
    }

    fn get_filter_index(&self) -> Option<usize> {
        self.table
            .get_state()
            .column_filters
            .iter()
            .position(|f| f.id == self.column.id)
    }

    fn set_filter_value(&self, value: impl Into<Value>) {
        let value = value.into();
        self.update_filter_value(move |_| value);
    }

    fn update_filter_value(&self, f: impl FnOnce(&Value) -> Value + 'static) {
        let column_id = self.column.id.clone();
        let filter_fn = self.get_filter_fn().ok();
        let updater = Updater::with(move |old: &ColumnFiltersState| {
            let previous = old.iter().find(|d| d.id == column_id);
            let next = f(previous.map(|d| &d.value).unwrap_or(&Value::Empty));

            if should_auto_remove(filter_fn.as_ref(), &next) {
                return old.iter().filter(|d| d.id != column_id).cloned().collect();
            }
            let entry = ColumnFilter {
                id: column_id.clone(),
                value: next,
            };
            if previous.is_some() {
                old.iter()
                    .map(|d| if d.id == column_id { entry.clone() } else { d.clone() })
                    .collect()
            } else {
                let mut next = old.clone();
                next.push(entry);
                next
            }
        });
        self.table
            .update_slice(updater, |s| &mut s.column_filters, |o| o.on_column_filters_change.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::options::TableOptions;
    use crate::state::PartialTableState;
    use serde_json::{json, Value as Json};

    fn table() -> Table<Json> {
        let columns = ColumnDefs::new(vec![
            ColumnDef::accessor("name"),
            ColumnDef::accessor("age"),
            ColumnDef::accessor("active"),
            ColumnDef::accessor("tag").filter_fn("nope"),
        ])
        .unwrap();
        let data = vec![
            json!({ "name": "Alice", "age": 30, "active": true }),
            json!({ "name": "Bob", "age": 25, "active": false }),
        ];
        Table::from_options(TableOptions::new(data, columns))
    }

    #[test]
    fn test_set_filter_value_adds_replaces_and_removes() {
        let table = table();
        let name = table.get_column("name").unwrap();
        name.set_filter_value("al");
        assert_eq!(name.get_filter_value(), Some(Value::from("al")));
        assert_eq!(name.get_filter_index(), Some(0));

        name.set_filter_value("bo");
        assert_eq!(table.get_state().column_filters.len(), 1);

        name.set_filter_value("");
        assert!(!name.get_is_filtered());
        assert!(table.get_state().column_filters.is_empty());
    }

    #[test]
    fn test_update_filter_value_sees_previous_value() {
        let table = table();
        let age = table.get_column("age").unwrap();
        age.set_filter_value(vec![20, 40]);
        age.update_filter_value(|old| match old.as_list() {
            Some(bounds) => Value::List(vec![bounds[0].clone(), Value::from(28)]),
            None => Value::Empty,
        });
        assert_eq!(age.get_filter_value(), Some(Value::from(vec![20, 28])));
    }

    #[test]
    fn test_auto_filter_fn_follows_first_value() {
        let table = table();
        let age = table.get_column("age").unwrap();
        // inNumberRange puts reversed bounds back in order
        let resolved = age.get_auto_filter_fn().resolve_filter_value(&Value::from(vec![40, 20]));
        assert_eq!(resolved, Value::from(vec![20, 40]));
    }

    #[test]
    fn test_global_filter_needs_text_or_number() {
        let table = table();
        assert!(table.get_column("name").unwrap().get_can_global_filter());
        assert!(table.get_column("age").unwrap().get_can_global_filter());
        assert!(!table.get_column("active").unwrap().get_can_global_filter());
    }

    #[test]
    fn test_unknown_named_filter_fn_is_an_error() {
        let table = table();
        let result = table.get_column("tag").unwrap().get_filter_fn();
        assert!(matches!(result, Err(TableError::UnknownFilterFn { ref name, .. }) if name == "nope"));
    }

    #[test]
    fn test_set_column_filters_drops_empty_values() {
        let table = table();
        table.set_column_filters(vec![ColumnFilter::new("name", ""), ColumnFilter::new("age", vec![1, 2])]);
        let ids: Vec<_> = table.get_state().column_filters.iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec!["age"]);
    }

    #[test]
    fn test_reset_global_filter_to_initial() {
        let columns = ColumnDefs::new(vec![ColumnDef::accessor("name")]).unwrap();
        let options = TableOptions::new(vec![json!({ "name": "x" })], columns).with_initial_state(PartialTableState {
            global_filter: Some(Value::from("x")),
            ..Default::default()
        });
        let table: Table<Json> = Table::from_options(options);
        table.set_global_filter(Value::from("y"));
        table.reset_global_filter(false);
        assert_eq!(table.get_state().global_filter, Value::from("x"));
        table.reset_global_filter(true);
        assert_eq!(table.get_state().global_filter, Value::Empty);
    }
}
