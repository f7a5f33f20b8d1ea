use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Failure building a column from a definition.
#[derive(Debug, Error)]
pub enum CreateColumnError {
    #[error("Invalid column type `{0}`")]
    UnknownType(String),

    #[error("Missing or invalid column {field} in {definition}")]
    InvalidDefinition { field: &'static str, definition: Value },
}

/// Failure building an index from a definition.
#[derive(Debug, Error)]
pub enum CreateIndexError {
    #[error("Missing or invalid index {field} in {definition}")]
    InvalidDefinition { field: &'static str, definition: Value },
}

/// Failure building a whole table from a definition.
#[derive(Debug, Error)]
pub enum CreateTableError {
    #[error("Missing or invalid table {field} in {definition}")]
    InvalidDefinition { field: &'static str, definition: Value },

    #[error("Invalid column in table `{table}`: {source}")]
    Column {
        table: String,
        #[source]
        source: CreateColumnError,
    },

    #[error("Invalid index in table `{table}`: {source}")]
    Index {
        table: String,
        #[source]
        source: CreateIndexError,
    },

    #[error(transparent)]
    Items(#[from] ItemsError),
}

/// Failure loading seed items.
#[derive(Debug, Error)]
pub enum ItemsError {
    #[error("Failed to read items file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse items file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Items in {path} must be an array of objects")]
    Shape { path: PathBuf },
}
