//! FILENAME: core/table-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column definition at {path} has no id: give it an id, an accessor key or a text header")]
    MissingColumnId { path: String },

    #[error("Duplicate column id: {0}")]
    DuplicateColumnId(String),

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Unknown filter function '{name}' on column '{column_id}'")]
    UnknownFilterFn { column_id: String, name: String },

    #[error("Unknown global filter function '{0}'")]
    UnknownGlobalFilterFn(String),

    #[error("Unknown sorting function '{name}' on column '{column_id}'")]
    UnknownSortingFn { column_id: String, name: String },

    #[error("Unknown aggregation function '{name}' on column '{column_id}'")]
    UnknownAggregationFn { column_id: String, name: String },

    #[error("State update rejected: {0}")]
    UpdateRejected(String),
}

pub type TableResult<T> = Result<T, TableError>;
