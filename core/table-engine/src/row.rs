//! FILENAME: core/table-engine/src/row.rs
//! PURPOSE: Row nodes, row models and the table-bound row handle.
//! CONTEXT: Rows are immutable once built. Stages that need a different shape
//! (filtered children, sorted children, regrouped depth) make shallow copies
//! that share the original row's `RowCache`, so a cell value is resolved at
//! most once per data load no matter how many stages touch the row.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::TableCell;
use crate::table::Table;
use crate::utils::flatten_by;
use crate::value::{Record, Value};

// ============================================================================
// ROW
// ============================================================================

/// Per-row memo storage, shared by every copy of a row.
#[derive(Debug, Default)]
pub struct RowCache {
    pub(crate) values: RefCell<FxHashMap<String, Value>>,
    pub(crate) grouping_values: RefCell<FxHashMap<String, Value>>,
    /// Column id (or `GLOBAL_FILTER_ID`) -> pass flag from the last filter run.
    pub(crate) column_filters: RefCell<FxHashMap<String, bool>>,
    /// Column id -> metadata a filter function left behind (fuzzy rank).
    pub(crate) column_filters_meta: RefCell<FxHashMap<String, Value>>,
}

pub struct Row<T> {
    pub id: String,
    /// Position among its siblings in the source (or group position for group rows).
    pub index: usize,
    pub depth: usize,
    pub parent_id: Option<String>,
    pub original: Rc<T>,
    pub sub_rows: Vec<Rc<Row<T>>>,

    /// Set on synthetic group rows only.
    pub grouping_column_id: Option<String>,
    pub grouping_value: Value,
    /// Data rows collected under a group row.
    pub leaf_rows: Vec<Rc<Row<T>>>,
    /// Grouping columns in effect when a group row was built.
    pub(crate) grouped_column_ids: Rc<[String]>,

    pub(crate) cache: Rc<RowCache>,
}

impl<T> Row<T> {
    pub(crate) fn new(
        id: String,
        original: Rc<T>,
        index: usize,
        depth: usize,
        sub_rows: Vec<Rc<Row<T>>>,
        parent_id: Option<String>,
    ) -> Self {
        Row {
            id,
            index,
            depth,
            parent_id,
            original,
            sub_rows,
            grouping_column_id: None,
            grouping_value: Value::Empty,
            leaf_rows: Vec::new(),
            grouped_column_ids: Rc::from(Vec::new()),
            cache: Rc::new(RowCache::default()),
        }
    }

    /// True for the synthetic rows produced by grouping.
    pub fn is_group_row(&self) -> bool {
        self.grouping_column_id.is_some()
    }

    /// Every row beneath this one, pre-order.
    pub fn get_leaf_rows(&self) -> Vec<Rc<Row<T>>> {
        flatten_by(&self.sub_rows, |row| row.sub_rows.as_slice())
    }

    /// Pass flags from the last filter run, keyed by column id.
    pub fn column_filters(&self) -> FxHashMap<String, bool> {
        self.cache.column_filters.borrow().clone()
    }

    /// Metadata a filter function recorded for `column_id`.
    pub fn column_filter_meta(&self, column_id: &str) -> Value {
        self.cache
            .column_filters_meta
            .borrow()
            .get(column_id)
            .cloned()
            .unwrap_or_default()
    }

    /// A copy with different children, sharing this row's cache.
    pub(crate) fn with_sub_rows(&self, sub_rows: Vec<Rc<Row<T>>>) -> Row<T> {
        Row {
            sub_rows,
            ..self.shallow_copy()
        }
    }

    /// A copy placed at another depth / parent, sharing this row's cache.
    pub(crate) fn relocated(
        &self,
        depth: usize,
        parent_id: Option<String>,
        sub_rows: Vec<Rc<Row<T>>>,
    ) -> Row<T> {
        Row {
            depth,
            parent_id,
            sub_rows,
            ..self.shallow_copy()
        }
    }

    fn shallow_copy(&self) -> Row<T> {
        Row {
            id: self.id.clone(),
            index: self.index,
            depth: self.depth,
            parent_id: self.parent_id.clone(),
            original: Rc::clone(&self.original),
            sub_rows: self.sub_rows.clone(),
            grouping_column_id: self.grouping_column_id.clone(),
            grouping_value: self.grouping_value.clone(),
            leaf_rows: self.leaf_rows.clone(),
            grouped_column_ids: Rc::clone(&self.grouped_column_ids),
            cache: Rc::clone(&self.cache),
        }
    }
}

impl<T> fmt::Debug for Row<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("depth", &self.depth)
            .field("parent_id", &self.parent_id)
            .field("sub_rows", &self.sub_rows.len())
            .finish()
    }
}

// ============================================================================
// ROW MODEL
// ============================================================================

/// An immutable snapshot of rows produced by one pipeline stage.
pub struct RowModel<T> {
    pub rows: Vec<Rc<Row<T>>>,
    /// Pre-order traversal of the forest under `rows`.
    pub flat_rows: Vec<Rc<Row<T>>>,
    pub rows_by_id: FxHashMap<String, Rc<Row<T>>>,
}

impl<T> RowModel<T> {
    pub fn empty() -> Self {
        RowModel {
            rows: Vec::new(),
            flat_rows: Vec::new(),
            rows_by_id: FxHashMap::default(),
        }
    }

    /// Builds the flat list and id index from a forest.
    pub fn from_rows(rows: Vec<Rc<Row<T>>>) -> Self {
        let flat_rows = flatten_by(&rows, |row| row.sub_rows.as_slice());
        let rows_by_id = index_rows(&flat_rows);
        RowModel {
            rows,
            flat_rows,
            rows_by_id,
        }
    }

    /// A model whose top-level `rows` already contain descendants (expanded or
    /// paged lists). Flattening skips ids that were already visited.
    pub(crate) fn from_listed_rows(rows: Vec<Rc<Row<T>>>) -> Self {
        let mut seen = FxHashSet::default();
        let mut flat_rows = Vec::new();
        for row in &rows {
            for node in flatten_by(std::slice::from_ref(row), |r| r.sub_rows.as_slice()) {
                if seen.insert(node.id.clone()) {
                    flat_rows.push(node);
                }
            }
        }
        let rows_by_id = index_rows(&flat_rows);
        RowModel {
            rows,
            flat_rows,
            rows_by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }
}

pub(crate) fn index_rows<T>(rows: &[Rc<Row<T>>]) -> FxHashMap<String, Rc<Row<T>>> {
    rows.iter().map(|row| (row.id.clone(), Rc::clone(row))).collect()
}

impl<T> fmt::Debug for RowModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowModel")
            .field("rows", &self.row_ids())
            .field("flat_rows", &self.flat_rows.len())
            .finish()
    }
}

// ============================================================================
// ROW HANDLE
// ============================================================================

/// A row bound to its table. Feature capabilities are traits implemented on this handle.
pub struct TableRow<'t, T> {
    pub(crate) table: &'t Table<T>,
    pub(crate) row: Rc<Row<T>>,
}

impl<'t, T: Record> TableRow<'t, T> {
    pub(crate) fn new(table: &'t Table<T>, row: Rc<Row<T>>) -> Self {
        TableRow { table, row }
    }

    pub fn table(&self) -> &'t Table<T> {
        self.table
    }

    pub fn row(&self) -> &Rc<Row<T>> {
        &self.row
    }

    /// The value of `column_id` for this row. Unknown columns read `Empty`.
    pub fn get_value(&self, column_id: &str) -> Value {
        let cached = self.row.cache.values.borrow().get(column_id).cloned();
        if let Some(value) = cached {
            return value;
        }

        let value = if self.row.is_group_row() {
            self.group_value(column_id)
        } else {
            match self.table.column_rc(column_id) {
                Some(column) => column.read_value(&self.row.original, self.row.index),
                None => return Value::Empty,
            }
        };

        self.row
            .cache
            .values
            .borrow_mut()
            .insert(column_id.to_string(), value.clone());
        value
    }

    /// Grouping columns repeat the first leaf's value; every other column aggregates.
    fn group_value(&self, column_id: &str) -> Value {
        if self.row.grouped_column_ids.iter().any(|id| id == column_id) {
            return match self.row.leaf_rows.first() {
                Some(first) => self.table.row_handle(Rc::clone(first)).get_value(column_id),
                None => Value::Empty,
            };
        }
        self.table.aggregate_group_value(&self.row, column_id)
    }

    /// Values this row contributes to a facet: the cell value itself.
    pub fn get_unique_values(&self, column_id: &str) -> Vec<Value> {
        vec![self.get_value(column_id)]
    }

    /// The cell value rendered with the column's formatter (or its display text).
    pub fn render_value(&self, column_id: &str) -> String {
        let value = self.get_value(column_id);
        match self.table.column_rc(column_id).and_then(|c| c.def.cell.clone()) {
            Some(format) => format(&value),
            None => value.to_string(),
        }
    }

    pub fn get_sub_rows(&self) -> Vec<TableRow<'t, T>> {
        self.wrap(self.row.sub_rows.iter().cloned())
    }

    pub fn get_leaf_rows(&self) -> Vec<TableRow<'t, T>> {
        self.wrap(self.row.get_leaf_rows())
    }

    pub fn get_parent_row(&self) -> Option<TableRow<'t, T>> {
        let parent_id = self.row.parent_id.as_deref()?;
        self.table.get_row(parent_id).ok()
    }

    /// Ancestors from the root down to the direct parent.
    pub fn get_parent_rows(&self) -> Vec<TableRow<'t, T>> {
        let mut parents = Vec::new();
        let mut current = self.get_parent_row();
        while let Some(parent) = current {
            current = parent.get_parent_row();
            parents.push(parent);
        }
        parents.reverse();
        parents
    }

    /// One cell per leaf column, in column order.
    pub fn get_all_cells(&self) -> Vec<TableCell<'t, T>> {
        self.table
            .ordered_leaf_columns()
            .iter()
            .map(|column| TableCell::new(self.table, Rc::clone(&self.row), Rc::clone(column)))
            .collect()
    }

    /// Cells of visible columns: pinned left, then center, then pinned right.
    pub fn get_visible_cells(&self) -> Vec<TableCell<'t, T>> {
        self.table
            .visible_leaf_columns()
            .iter()
            .map(|column| TableCell::new(self.table, Rc::clone(&self.row), Rc::clone(column)))
            .collect()
    }

    fn wrap(&self, rows: impl IntoIterator<Item = Rc<Row<T>>>) -> Vec<TableRow<'t, T>> {
        rows.into_iter().map(|row| TableRow::new(self.table, row)).collect()
    }
}

impl<'t, T: Record> Clone for TableRow<'t, T> {
    fn clone(&self) -> Self {
        TableRow::new(self.table, Rc::clone(&self.row))
    }
}

impl<'t, T: Record> Deref for TableRow<'t, T> {
    type Target = Row<T>;

    fn deref(&self) -> &Row<T> {
        &self.row
    }
}

impl<'t, T: Record> fmt::Debug for TableRow<'t, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TableRow").field(&self.row.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str, depth: usize, parent: Option<&str>) -> Rc<Row<u32>> {
        Rc::new(Row::new(id.to_string(), Rc::new(0), 0, depth, Vec::new(), parent.map(str::to_string)))
    }

    #[test]
    fn test_row_model_flattens_pre_order() {
        let child_a = leaf("0.0", 1, Some("0"));
        let child_b = leaf("0.1", 1, Some("0"));
        let parent = Rc::new(Row::new("0".to_string(), Rc::new(0), 0, 0, vec![child_a, child_b], None));
        let model = RowModel::from_rows(vec![parent, leaf("1", 0, None)]);

        let flat: Vec<_> = model.flat_rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(flat, vec!["0", "0.0", "0.1", "1"]);
        assert_eq!(model.rows_by_id.len(), 4);
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn test_listed_rows_do_not_duplicate_descendants() {
        let child = leaf("0.0", 1, Some("0"));
        let parent = Rc::new(Row::new("0".to_string(), Rc::new(0), 0, 0, vec![Rc::clone(&child)], None));
        let model = RowModel::from_listed_rows(vec![parent, child]);
        assert_eq!(model.rows.len(), 2);
        assert_eq!(model.flat_rows.len(), 2);
    }

    #[test]
    fn test_copies_share_cache() {
        let row = leaf("0", 0, None);
        let copy = Rc::new(row.relocated(2, Some("g".to_string()), Vec::new()));
        row.cache.values.borrow_mut().insert("a".to_string(), Value::from(1));
        assert_eq!(copy.cache.values.borrow().get("a"), Some(&Value::from(1)));
        assert_eq!(copy.depth, 2);
        assert_eq!(copy.parent_id.as_deref(), Some("g"));
    }
}
