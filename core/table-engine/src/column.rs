//! FILENAME: core/table-engine/src/column.rs
//! PURPOSE: Column definitions, id resolution and the column tree.
//! CONTEXT: `ColumnDefs::new` validates every definition once, so the table
//! only ever holds addressable columns. Feature capabilities on columns live
//! in the feature modules as traits implemented for `TableColumn`.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{TableError, TableResult};
use crate::features::aggregation_fns::AggregationFn;
use crate::features::filter_fns::FilterFn;
use crate::features::sorting_fns::SortingFn;
use crate::table::Table;
use crate::value::{Record, Value};

pub const DEFAULT_COLUMN_SIZE: f64 = 150.0;
pub const DEFAULT_COLUMN_MIN_SIZE: f64 = 20.0;
pub const DEFAULT_COLUMN_MAX_SIZE: f64 = f64::MAX;

// ============================================================================
// FUNCTION REFERENCES
// ============================================================================

/// Selects a filter, sorting or aggregation function for a column.
pub enum FnRef<F> {
    /// Inferred from the column's data.
    Auto,
    /// Looked up in the table's custom registry, then among the built-ins.
    Named(String),
    Custom(F),
}

impl<F> FnRef<F> {
    pub fn named(name: impl Into<String>) -> Self {
        FnRef::Named(name.into())
    }
}

impl<F> Default for FnRef<F> {
    fn default() -> Self {
        FnRef::Auto
    }
}

impl<F: Clone> Clone for FnRef<F> {
    fn clone(&self) -> Self {
        match self {
            FnRef::Auto => FnRef::Auto,
            FnRef::Named(name) => FnRef::Named(name.clone()),
            FnRef::Custom(f) => FnRef::Custom(f.clone()),
        }
    }
}

impl<F> fmt::Debug for FnRef<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FnRef::Auto => f.write_str("Auto"),
            FnRef::Named(name) => write!(f, "Named({:?})", name),
            FnRef::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<F> From<&str> for FnRef<F> {
    fn from(name: &str) -> Self {
        FnRef::Named(name.to_string())
    }
}

impl<F> From<String> for FnRef<F> {
    fn from(name: String) -> Self {
        FnRef::Named(name)
    }
}

/// Resolves a function name against a custom registry, then the built-ins.
pub(crate) fn lookup_named<F: Clone>(
    name: &str,
    custom: &FxHashMap<String, F>,
    builtin: impl Fn(&str) -> Option<F>,
) -> Option<F> {
    custom.get(name).cloned().or_else(|| builtin(name))
}

// ============================================================================
// COLUMN DEFINITION
// ============================================================================

/// How a column reads its value from a record.
pub enum Accessor<T> {
    /// Field path on the record (`"address.city"`).
    Key(String),
    /// Derivation from the record and its index.
    Fn(Rc<dyn Fn(&T, usize) -> Value>),
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        match self {
            Accessor::Key(key) => Accessor::Key(key.clone()),
            Accessor::Fn(f) => Accessor::Fn(Rc::clone(f)),
        }
    }
}

/// Where empty values go when sorting, regardless of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortUndefined {
    First,
    Last,
    /// Empty values are handed to the sorting function like any other value.
    #[default]
    Default,
}

/// Renders a cell value for display.
pub type CellFormatter = Rc<dyn Fn(&Value) -> String>;

/// A user-supplied column definition. Nested `columns` make a header group.
pub struct ColumnDef<T> {
    pub id: Option<String>,
    pub accessor: Option<Accessor<T>>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub cell: Option<CellFormatter>,
    pub columns: Vec<ColumnDef<T>>,

    pub filter_fn: FnRef<FilterFn<T>>,
    pub sorting_fn: FnRef<SortingFn<T>>,
    pub aggregation_fn: FnRef<AggregationFn<T>>,
    /// Custom key rows are grouped by. Defaults to the cell value.
    pub grouping_value: Option<Rc<dyn Fn(&T) -> Value>>,

    pub enable_sorting: Option<bool>,
    pub enable_multi_sort: Option<bool>,
    pub enable_column_filter: Option<bool>,
    pub enable_global_filter: Option<bool>,
    pub enable_grouping: Option<bool>,
    pub enable_hiding: Option<bool>,
    pub enable_pinning: Option<bool>,
    pub enable_resizing: Option<bool>,

    pub sort_desc_first: Option<bool>,
    /// Flips the column's sort order (for "lower is better" values like ranks).
    pub invert_sorting: bool,
    pub sort_undefined: SortUndefined,

    pub size: Option<f64>,
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
}

impl<T> Default for ColumnDef<T> {
    fn default() -> Self {
        ColumnDef {
            id: None,
            accessor: None,
            header: None,
            footer: None,
            cell: None,
            columns: Vec::new(),
            filter_fn: FnRef::Auto,
            sorting_fn: FnRef::Auto,
            aggregation_fn: FnRef::Auto,
            grouping_value: None,
            enable_sorting: None,
            enable_multi_sort: None,
            enable_column_filter: None,
            enable_global_filter: None,
            enable_grouping: None,
            enable_hiding: None,
            enable_pinning: None,
            enable_resizing: None,
            sort_desc_first: None,
            invert_sorting: false,
            sort_undefined: SortUndefined::Default,
            size: None,
            min_size: None,
            max_size: None,
        }
    }
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        ColumnDef {
            id: self.id.clone(),
            accessor: self.accessor.clone(),
            header: self.header.clone(),
            footer: self.footer.clone(),
            cell: self.cell.clone(),
            columns: self.columns.clone(),
            filter_fn: self.filter_fn.clone(),
            sorting_fn: self.sorting_fn.clone(),
            aggregation_fn: self.aggregation_fn.clone(),
            grouping_value: self.grouping_value.clone(),
            enable_sorting: self.enable_sorting,
            enable_multi_sort: self.enable_multi_sort,
            enable_column_filter: self.enable_column_filter,
            enable_global_filter: self.enable_global_filter,
            enable_grouping: self.enable_grouping,
            enable_hiding: self.enable_hiding,
            enable_pinning: self.enable_pinning,
            enable_resizing: self.enable_resizing,
            sort_desc_first: self.sort_desc_first,
            invert_sorting: self.invert_sorting,
            sort_undefined: self.sort_undefined,
            size: self.size,
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl<T: Record> ColumnDef<T> {
    /// A column reading the record field at `key`.
    pub fn accessor(key: impl Into<String>) -> Self {
        ColumnDef {
            accessor: Some(Accessor::Key(key.into())),
            ..Default::default()
        }
    }

    /// A column deriving its value with `f`. Derived columns need an explicit id.
    pub fn accessor_fn(id: impl Into<String>, f: impl Fn(&T, usize) -> Value + 'static) -> Self {
        ColumnDef {
            id: Some(id.into()),
            accessor: Some(Accessor::Fn(Rc::new(f))),
            ..Default::default()
        }
    }

    /// A column with no value (action buttons, row numbers).
    pub fn display(id: impl Into<String>) -> Self {
        ColumnDef {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// A header group spanning `columns`.
    pub fn group(header: impl Into<String>, columns: Vec<ColumnDef<T>>) -> Self {
        ColumnDef {
            header: Some(header.into()),
            columns,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_accessor_fn(mut self, f: impl Fn(&T, usize) -> Value + 'static) -> Self {
        self.accessor = Some(Accessor::Fn(Rc::new(f)));
        self
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn cell(mut self, f: impl Fn(&Value) -> String + 'static) -> Self {
        self.cell = Some(Rc::new(f));
        self
    }

    pub fn filter_fn(mut self, filter_fn: impl Into<FnRef<FilterFn<T>>>) -> Self {
        self.filter_fn = filter_fn.into();
        self
    }

    pub fn sorting_fn(mut self, sorting_fn: impl Into<FnRef<SortingFn<T>>>) -> Self {
        self.sorting_fn = sorting_fn.into();
        self
    }

    pub fn aggregation_fn(mut self, aggregation_fn: impl Into<FnRef<AggregationFn<T>>>) -> Self {
        self.aggregation_fn = aggregation_fn.into();
        self
    }

    pub fn grouping_value(mut self, f: impl Fn(&T) -> Value + 'static) -> Self {
        self.grouping_value = Some(Rc::new(f));
        self
    }

    pub fn enable_sorting(mut self, enabled: bool) -> Self {
        self.enable_sorting = Some(enabled);
        self
    }

    pub fn enable_multi_sort(mut self, enabled: bool) -> Self {
        self.enable_multi_sort = Some(enabled);
        self
    }

    pub fn enable_column_filter(mut self, enabled: bool) -> Self {
        self.enable_column_filter = Some(enabled);
        self
    }

    pub fn enable_global_filter(mut self, enabled: bool) -> Self {
        self.enable_global_filter = Some(enabled);
        self
    }

    pub fn enable_grouping(mut self, enabled: bool) -> Self {
        self.enable_grouping = Some(enabled);
        self
    }

    pub fn enable_hiding(mut self, enabled: bool) -> Self {
        self.enable_hiding = Some(enabled);
        self
    }

    pub fn enable_pinning(mut self, enabled: bool) -> Self {
        self.enable_pinning = Some(enabled);
        self
    }

    pub fn enable_resizing(mut self, enabled: bool) -> Self {
        self.enable_resizing = Some(enabled);
        self
    }

    pub fn sort_desc_first(mut self, desc_first: bool) -> Self {
        self.sort_desc_first = Some(desc_first);
        self
    }

    pub fn invert_sorting(mut self, invert: bool) -> Self {
        self.invert_sorting = invert;
        self
    }

    pub fn sort_undefined(mut self, placement: SortUndefined) -> Self {
        self.sort_undefined = placement;
        self
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn min_size(mut self, min_size: f64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    pub fn max_size(mut self, max_size: f64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// The id this definition resolves to, if it has one.
    fn resolved_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        match &self.accessor {
            Some(Accessor::Key(key)) => Some(key.replace('.', "_")),
            Some(Accessor::Fn(_)) => None,
            None => self.header.clone(),
        }
    }
}

// ============================================================================
// COLUMN TREE
// ============================================================================

/// A built column: a definition with a resolved id and its place in the tree.
pub struct Column<T> {
    pub id: String,
    pub depth: usize,
    pub parent_id: Option<String>,
    pub def: ColumnDef<T>,
    pub columns: Vec<Rc<Column<T>>>,
}

impl<T: Record> Column<T> {
    pub fn has_accessor(&self) -> bool {
        self.def.accessor.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reads this column's value from a record. Display and group columns read `Empty`.
    pub fn read_value(&self, original: &T, index: usize) -> Value {
        match &self.def.accessor {
            Some(Accessor::Key(key)) => original.field(key),
            Some(Accessor::Fn(f)) => f(original, index),
            None => Value::Empty,
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("parent_id", &self.parent_id)
            .field("columns", &self.columns)
            .finish()
    }
}

/// Leaf columns beneath `column`, or the column itself when it is a leaf.
pub(crate) fn leaf_columns_of<T>(column: &Rc<Column<T>>) -> Vec<Rc<Column<T>>> {
    if column.columns.is_empty() {
        return vec![Rc::clone(column)];
    }
    column.columns.iter().flat_map(leaf_columns_of).collect()
}

/// Pre-order flattening of `column` and everything beneath it.
pub(crate) fn flat_columns_of<T>(column: &Rc<Column<T>>) -> Vec<Rc<Column<T>>> {
    let mut out = vec![Rc::clone(column)];
    for child in &column.columns {
        out.extend(flat_columns_of(child));
    }
    out
}

/// The validated column tree in declaration order.
pub struct ColumnTree<T> {
    pub roots: Vec<Rc<Column<T>>>,
    /// Pre-order flattening of every column.
    pub flat: Vec<Rc<Column<T>>>,
    /// Leaf columns in declaration order.
    pub leaves: Vec<Rc<Column<T>>>,
    pub by_id: FxHashMap<String, Rc<Column<T>>>,
}

impl<T: Record> ColumnTree<T> {
    fn build(defs: Vec<ColumnDef<T>>) -> TableResult<Self> {
        let mut seen = FxHashSet::default();
        let roots = build_level(defs, 0, None, "columns", &mut seen)?;
        let flat: Vec<_> = roots.iter().flat_map(flat_columns_of).collect();
        let leaves = roots.iter().flat_map(leaf_columns_of).collect();
        let by_id = flat.iter().map(|c| (c.id.clone(), Rc::clone(c))).collect();
        Ok(ColumnTree {
            roots,
            flat,
            leaves,
            by_id,
        })
    }
}

fn build_level<T: Record>(
    defs: Vec<ColumnDef<T>>,
    depth: usize,
    parent_id: Option<&str>,
    path: &str,
    seen: &mut FxHashSet<String>,
) -> TableResult<Vec<Rc<Column<T>>>> {
    let mut columns = Vec::with_capacity(defs.len());
    for (i, mut def) in defs.into_iter().enumerate() {
        let here = format!("{}[{}]", path, i);
        let id = def
            .resolved_id()
            .ok_or_else(|| TableError::MissingColumnId { path: here.clone() })?;
        if !seen.insert(id.clone()) {
            return Err(TableError::DuplicateColumnId(id));
        }
        let children = std::mem::take(&mut def.columns);
        let sub = build_level(children, depth + 1, Some(&id), &format!("{}.columns", here), seen)?;
        columns.push(Rc::new(Column {
            id,
            depth,
            parent_id: parent_id.map(str::to_string),
            def,
            columns: sub,
        }));
    }
    Ok(columns)
}

/// A validated set of column definitions, ready to hand to `TableOptions`.
///
/// Cloning is cheap and keeps identity, so memoized column structure is only
/// rebuilt when a new `ColumnDefs` is created.
pub struct ColumnDefs<T> {
    tree: Rc<ColumnTree<T>>,
}

impl<T: Record> ColumnDefs<T> {
    pub fn new(defs: Vec<ColumnDef<T>>) -> TableResult<Self> {
        Ok(ColumnDefs {
            tree: Rc::new(ColumnTree::build(defs)?),
        })
    }

    pub fn tree(&self) -> &Rc<ColumnTree<T>> {
        &self.tree
    }
}

impl<T> Clone for ColumnDefs<T> {
    fn clone(&self) -> Self {
        ColumnDefs {
            tree: Rc::clone(&self.tree),
        }
    }
}

// ============================================================================
// COLUMN HANDLE
// ============================================================================

/// A column bound to its table. Feature capabilities are traits implemented on this handle.
pub struct TableColumn<'t, T> {
    pub(crate) table: &'t Table<T>,
    pub(crate) column: Rc<Column<T>>,
}

impl<'t, T: Record> TableColumn<'t, T> {
    pub(crate) fn new(table: &'t Table<T>, column: Rc<Column<T>>) -> Self {
        TableColumn { table, column }
    }

    pub fn table(&self) -> &'t Table<T> {
        self.table
    }

    pub fn column(&self) -> &Rc<Column<T>> {
        &self.column
    }

    pub fn get_parent(&self) -> Option<TableColumn<'t, T>> {
        let parent_id = self.column.parent_id.as_deref()?;
        self.table.get_column(parent_id)
    }

    pub fn get_columns(&self) -> Vec<TableColumn<'t, T>> {
        self.wrap(self.column.columns.iter().cloned())
    }

    /// This column and every column beneath it, pre-order.
    pub fn get_flat_columns(&self) -> Vec<TableColumn<'t, T>> {
        self.wrap(flat_columns_of(&self.column))
    }

    /// Leaf columns beneath this one, in current column order.
    pub fn get_leaf_columns(&self) -> Vec<TableColumn<'t, T>> {
        let leaves = leaf_columns_of(&self.column);
        if leaves.len() <= 1 {
            return self.wrap(leaves);
        }
        let ordered = self.table.order_columns(leaves);
        self.wrap(ordered)
    }

    pub fn header_text(&self) -> String {
        self.column.def.header.clone().unwrap_or_else(|| self.column.id.clone())
    }

    fn wrap(&self, columns: impl IntoIterator<Item = Rc<Column<T>>>) -> Vec<TableColumn<'t, T>> {
        columns
            .into_iter()
            .map(|c| TableColumn::new(self.table, c))
            .collect()
    }
}

impl<'t, T: Record> Clone for TableColumn<'t, T> {
    fn clone(&self) -> Self {
        TableColumn::new(self.table, Rc::clone(&self.column))
    }
}

impl<'t, T: Record> Deref for TableColumn<'t, T> {
    type Target = Column<T>;

    fn deref(&self) -> &Column<T> {
        &self.column
    }
}

impl<'t, T: Record> fmt::Debug for TableColumn<'t, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TableColumn").field(&self.column.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as Json;

    #[test]
    fn test_ids_resolve_from_id_key_or_header() {
        let defs = ColumnDefs::<Json>::new(vec![
            ColumnDef::accessor("address.city"),
            ColumnDef::accessor("name").id("full_name"),
            ColumnDef::group("Stats", vec![ColumnDef::accessor("age")]),
        ])
        .unwrap();
        let ids: Vec<_> = defs.tree().flat.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["address_city", "full_name", "Stats", "age"]);
        assert_eq!(defs.tree().leaves.len(), 3);
        assert_eq!(defs.tree().by_id["age"].parent_id.as_deref(), Some("Stats"));
        assert_eq!(defs.tree().by_id["age"].depth, 1);
    }

    #[test]
    fn test_function_accessor_without_id_fails() {
        let result = ColumnDefs::<Json>::new(vec![
            ColumnDef::accessor("name"),
            ColumnDef::<Json>::default().with_accessor_fn(|_, i| Value::from(i)),
        ]);
        assert!(matches!(result, Err(TableError::MissingColumnId { ref path }) if path == "columns[1]"));

        // header text does not stand in for the id of a computed column
        let result = ColumnDefs::<Json>::new(vec![ColumnDef::<Json>::default()
            .with_accessor_fn(|_, i| Value::from(i))
            .header("Double")]);
        assert!(matches!(result, Err(TableError::MissingColumnId { ref path }) if path == "columns[0]"));
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let result = ColumnDefs::<Json>::new(vec![
            ColumnDef::accessor("name"),
            ColumnDef::group("Other", vec![ColumnDef::accessor("name")]),
        ]);
        assert_eq!(result.err(), Some(TableError::DuplicateColumnId("name".to_string())));
    }

    #[test]
    fn test_read_value_uses_accessor() {
        let defs = ColumnDefs::<Json>::new(vec![
            ColumnDef::accessor("name"),
            ColumnDef::accessor_fn("double", |r: &Json, _| {
                Value::from(r["age"].as_f64().unwrap_or(0.0) * 2.0)
            }),
            ColumnDef::display("actions"),
        ])
        .unwrap();
        let record = serde_json::json!({ "name": "Alice", "age": 30 });
        let tree = defs.tree();
        assert_eq!(tree.by_id["name"].read_value(&record, 0), Value::from("Alice"));
        assert_eq!(tree.by_id["double"].read_value(&record, 0), Value::from(60));
        assert_eq!(tree.by_id["actions"].read_value(&record, 0), Value::Empty);
    }
}
