//! FILENAME: core/table-engine/src/cell.rs

use std::fmt;
use std::rc::Rc;

use crate::column::{Column, TableColumn};
use crate::row::{Row, TableRow};
use crate::table::Table;
use crate::value::{Record, Value};

/// The intersection of a row and a leaf column. Holds no state of its own;
/// the value is resolved (and cached) through the row.
pub struct TableCell<'t, T> {
    pub(crate) table: &'t Table<T>,
    pub(crate) row: Rc<Row<T>>,
    pub(crate) column: Rc<Column<T>>,
}

impl<'t, T: Record> TableCell<'t, T> {
    pub(crate) fn new(table: &'t Table<T>, row: Rc<Row<T>>, column: Rc<Column<T>>) -> Self {
        TableCell { table, row, column }
    }

    /// `"{row id}_{column id}"`
    pub fn id(&self) -> String {
        format!("{}_{}", self.row.id, self.column.id)
    }

    pub fn get_row(&self) -> TableRow<'t, T> {
        TableRow::new(self.table, Rc::clone(&self.row))
    }

    pub fn get_column(&self) -> TableColumn<'t, T> {
        TableColumn::new(self.table, Rc::clone(&self.column))
    }

    pub fn column_id(&self) -> &str {
        &self.column.id
    }

    pub fn get_value(&self) -> Value {
        self.get_row().get_value(&self.column.id)
    }

    pub fn render_value(&self) -> String {
        self.get_row().render_value(&self.column.id)
    }
}

impl<'t, T: Record> Clone for TableCell<'t, T> {
    fn clone(&self) -> Self {
        TableCell::new(self.table, Rc::clone(&self.row), Rc::clone(&self.column))
    }
}

impl<'t, T: Record> fmt::Debug for TableCell<'t, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TableCell").field(&self.id()).finish()
    }
}
