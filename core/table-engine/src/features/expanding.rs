//! FILENAME: core/table-engine/src/features/expanding.rs
//! PURPOSE: Expanded state and the row expanding capability.
//! CONTEXT: `ExpandedState::All` expands every row. Toggling one row while
//! everything is expanded first turns `All` into an explicit map holding
//! every row the state can address, on every page, then flips the target.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::features::Feature;
use crate::row::{Row, RowModel, TableRow};
use crate::state::{ExpandedState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

impl<T: Record> Table<T> {
    pub fn set_expanded(&self, updater: impl Into<Updater<ExpandedState>>) {
        self.update_slice(updater.into(), |s| &mut s.expanded, |o| o.on_expanded_change.as_ref());
    }

    pub fn reset_expanded(&self, default: bool) {
        let next = if default {
            TableState::default().expanded
        } else {
            self.initial_state().expanded.clone()
        };
        self.set_expanded(next);
    }

    /// `Some(true)` expands everything, `Some(false)` collapses everything,
    /// `None` flips between the two.
    pub fn toggle_all_rows_expanded(&self, expanded: Option<bool>) {
        if expanded.unwrap_or_else(|| !self.get_is_all_rows_expanded()) {
            self.set_expanded(ExpandedState::All);
        } else {
            self.set_expanded(ExpandedState::default());
        }
    }

    /// True when any row before pagination has children to expand.
    pub fn get_can_some_rows_expand(&self) -> bool {
        match self.get_pre_pagination_row_model() {
            Ok(model) => model
                .flat_rows
                .iter()
                .any(|row| self.row_handle(row.clone()).get_can_expand()),
            Err(_) => false,
        }
    }

    pub fn get_is_some_rows_expanded(&self) -> bool {
        match self.get_state().expanded {
            ExpandedState::All => true,
            ExpandedState::Rows(rows) => rows.values().any(|v| *v),
        }
    }

    pub fn get_is_all_rows_expanded(&self) -> bool {
        let expanded = self.get_state().expanded;
        match &expanded {
            ExpandedState::All => true,
            ExpandedState::Rows(rows) if rows.is_empty() => false,
            ExpandedState::Rows(_) => match self.get_row_model() {
                Ok(model) => model
                    .flat_rows
                    .iter()
                    .all(|row| expanded.get(&row.id) == Some(true)),
                Err(_) => false,
            },
        }
    }

    /// Deepest level reachable through expanded rows: one more than the
    /// deepest expanded row's depth. Ids that resolve to no row are skipped.
    pub fn get_expanded_depth(&self) -> usize {
        let model = self.expandable_rows();
        let depth_of = |row: &Rc<Row<T>>| row.depth + 1;
        match self.get_state().expanded {
            ExpandedState::All => model.flat_rows.iter().map(depth_of).max().unwrap_or(0),
            ExpandedState::Rows(rows) => rows
                .iter()
                .filter(|(_, expanded)| **expanded)
                .filter_map(|(id, _)| model.rows_by_id.get(id))
                .map(depth_of)
                .max()
                .unwrap_or(0),
        }
    }

    /// Every row the expansion state can address, across all pages (the core
    /// model if a stage fails).
    fn expandable_rows(&self) -> Rc<RowModel<T>> {
        self.get_pre_pagination_row_model().unwrap_or_else(|err| {
            log::warn!(target: "table_engine::expanding", "falling back to core rows: {}", err);
            self.get_core_row_model()
        })
    }
}

pub trait RowExpanding {
    /// `Some` forces the state, `None` flips it.
    fn toggle_expanded(&self, expanded: Option<bool>);
    fn get_is_expanded(&self) -> bool;
    fn get_can_expand(&self) -> bool;
    fn get_is_all_parents_expanded(&self) -> bool;
}

impl<'t, T: Record> RowExpanding for TableRow<'t, T> {
    fn toggle_expanded(&self, expanded: Option<bool>) {
        let row_id = self.row.id.clone();
        let seed = match self.table.get_state().expanded {
            ExpandedState::All => Some(self.table.expandable_rows().rows_by_id.keys().cloned().collect::<Vec<_>>()),
            ExpandedState::Rows(_) => None,
        };
        self.table.set_expanded(Updater::with(move |old: &ExpandedState| {
            let exists = old.get(&row_id).unwrap_or(false);
            let mut rows: BTreeMap<String, bool> = match old {
                ExpandedState::All => seed
                    .unwrap_or_default()
                    .into_iter()
                    .map(|id| (id, true))
                    .collect(),
                ExpandedState::Rows(rows) => rows.clone(),
            };
            let expanded = expanded.unwrap_or(!exists);
            if !exists && expanded {
                rows.insert(row_id, true);
            } else if exists && !expanded {
                rows.remove(&row_id);
            } else {
                return old.clone();
            }
            ExpandedState::Rows(rows)
        }));
    }

    fn get_is_expanded(&self) -> bool {
        self.table.get_state().expanded.get(&self.row.id).unwrap_or(false)
    }

    fn get_can_expand(&self) -> bool {
        self.table.has_feature(Feature::RowExpanding)
            && self.table.options().settings.enable_expanding
            && !self.row.sub_rows.is_empty()
    }

    fn get_is_all_parents_expanded(&self) -> bool {
        let mut current = self.get_parent_row();
        while let Some(parent) = current {
            if !parent.get_is_expanded() {
                return false;
            }
            current = parent.get_parent_row();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnDefs};
    use crate::options::TableOptions;
    use crate::row_models::RowModelPipeline;
    use crate::state::PaginationState;
    use serde_json::{json, Value as Json};

    fn children(record: &Json, _: usize) -> Option<&[Json]> {
        record.get("children").and_then(|c| c.as_array()).map(|v| v.as_slice())
    }

    fn table() -> Table<Json> {
        let columns = ColumnDefs::new(vec![ColumnDef::accessor("name")]).unwrap();
        let data = vec![
            json!({ "name": "Electronics", "children": [
                { "name": "Phones", "children": [{ "name": "Android" }] },
                { "name": "Laptops" }
            ] }),
            json!({ "name": "Clothing" }),
        ];
        let options = TableOptions::new(data, columns)
            .with_sub_rows(children)
            .with_pipeline(RowModelPipeline::new().with_expanded());
        Table::from_options(options)
    }

    fn rows(table: &Table<Json>) -> Vec<String> {
        table.get_row_model().unwrap().row_ids()
    }

    #[test]
    fn test_toggle_row_inserts_children() {
        let table = table();
        let electronics = table.get_row("0").unwrap();
        assert!(electronics.get_can_expand());
        electronics.toggle_expanded(None);
        assert!(electronics.get_is_expanded());
        assert_eq!(rows(&table), vec!["0", "0.0", "0.1", "1"]);
        electronics.toggle_expanded(None);
        assert_eq!(rows(&table), vec!["0", "1"]);
    }

    #[test]
    fn test_toggle_all_and_back() {
        let table = table();
        table.toggle_all_rows_expanded(None);
        assert_eq!(table.get_state().expanded, ExpandedState::All);
        assert!(table.get_is_all_rows_expanded());
        assert_eq!(rows(&table), vec!["0", "0.0", "0.0.0", "0.1", "1"]);
        assert_eq!(table.get_expanded_depth(), 3);
        table.toggle_all_rows_expanded(None);
        assert!(!table.get_is_some_rows_expanded());
    }

    #[test]
    fn test_collapsing_one_row_from_all_seeds_the_map() {
        let table = table();
        table.set_expanded(ExpandedState::All);
        table.get_row("0.0").unwrap().toggle_expanded(Some(false));

        let expanded = table.get_state().expanded;
        assert_eq!(expanded.get("0"), Some(true));
        assert_eq!(expanded.get("0.0"), None);
        assert_eq!(expanded.get("1"), Some(true));
        assert_eq!(rows(&table), vec!["0", "0.0", "0.1", "1"]);
    }

    #[test]
    fn test_parents_expanded() {
        let table = table();
        let android = table.get_core_row_model().rows_by_id["0.0.0"].clone();
        let android = table.row_handle(android);
        assert!(!android.get_is_all_parents_expanded());
        table.get_row("0").unwrap().toggle_expanded(Some(true));
        table.get_row("0.0").unwrap().toggle_expanded(Some(true));
        assert!(android.get_is_all_parents_expanded());
        assert!(table.get_can_some_rows_expand());
        assert!(!table.get_row("1").unwrap().get_can_expand());
    }

    #[test]
    fn test_collapsing_from_all_keeps_other_pages_expanded() {
        let columns = ColumnDefs::new(vec![ColumnDef::accessor("name")]).unwrap();
        let data = vec![
            json!({ "name": "Electronics", "children": [{ "name": "Phones" }] }),
            json!({ "name": "Clothing", "children": [{ "name": "Shirts" }] }),
        ];
        let options = TableOptions::new(data, columns)
            .with_sub_rows(children)
            .with_pipeline(RowModelPipeline::new().with_expanded().with_paginated());
        let table = Table::from_options(options);
        table.set_pagination(PaginationState { page_index: 0, page_size: 2 });
        table.set_expanded(ExpandedState::All);
        assert_eq!(rows(&table), vec!["0", "0.0"]);

        table.get_row("0").unwrap().toggle_expanded(Some(false));
        let expanded = table.get_state().expanded;
        assert_eq!(expanded.get("0"), None);
        assert_eq!(expanded.get("1"), Some(true));
        assert_eq!(rows(&table), vec!["0", "1"]);
    }

    #[test]
    fn test_expanded_depth_follows_row_depth() {
        let columns = ColumnDefs::new(vec![ColumnDef::accessor("name")]).unwrap();
        let data = vec![json!({ "name": "Electronics", "children": [
            { "name": "Phones", "children": [{ "name": "Android" }] }
        ] })];
        let options = TableOptions::new(data, columns)
            .with_sub_rows(children)
            .with_row_id(|r: &Json, _, _| r["name"].as_str().unwrap_or_default().to_string())
            .with_pipeline(RowModelPipeline::new().with_expanded());
        let table = Table::from_options(options);

        table.set_expanded(ExpandedState::Rows(BTreeMap::from([
            ("Electronics".to_string(), true),
            ("Phones".to_string(), true),
            ("gone".to_string(), true),
        ])));
        assert_eq!(table.get_expanded_depth(), 2);
        assert_eq!(rows(&table), vec!["Electronics", "Phones", "Android"]);

        table.set_expanded(ExpandedState::Rows(BTreeMap::new()));
        assert_eq!(table.get_expanded_depth(), 0);
    }
}
