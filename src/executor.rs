//! `Executor` Module
//!
//! Provides the [`Executor`] trait that abstracts a raw database handle.
//! [`Database`](crate::database::Database) layers parameters and nested
//! transactions on top of it; the processors only ever talk to a `Database`.

use thiserror::Error;

use crate::{Row, Value};

/// MySQL `ER_NO_SUCH_TABLE`.
pub const ER_NO_SUCH_TABLE: u16 = 1146;

/// Error raised by an executor or by the transaction bookkeeping above it.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The engine rejected a statement.
    #[error("Query error{}: {message}", code.map(|c| format!(" [{c}]")).unwrap_or_default())]
    Query { code: Option<u16>, message: String },

    /// The connection is unusable.
    #[error("Connection error: {0}")]
    Connection(String),

    /// `commit` or `rollback` without a matching `begin`.
    #[error("No active transaction")]
    NoActiveTransaction,

    /// A shared connection's lock was poisoned by a panicking holder.
    #[error("Database `{0}` is poisoned")]
    Poisoned(String),
}

impl DatabaseError {
    pub fn query(message: impl Into<String>) -> Self {
        DatabaseError::Query {
            code: None,
            message: message.into(),
        }
    }

    /// Whether the error reports that the queried table does not exist.
    ///
    /// Matches the MySQL error code first and falls back to the message for
    /// drivers that do not expose codes.
    pub fn is_table_missing(&self) -> bool {
        match self {
            DatabaseError::Query { code, message } => {
                if *code == Some(ER_NO_SUCH_TABLE) {
                    return true;
                }
                let message = message.to_lowercase();
                message.contains("doesn't exist") || message.contains("no such table")
            }
            _ => false,
        }
    }
}

/// A raw connection able to run statements and control one flat transaction.
///
/// Bindings are positional `?` placeholders.
pub trait Executor: Send {
    /// Driver identity, e.g. `mysql`. Processors dispatch on it.
    fn driver_name(&self) -> &str;

    /// Runs a statement and returns the affected row count.
    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<u64, DatabaseError>;

    /// Runs a query and returns every row keyed by column name.
    fn query(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, DatabaseError>;

    fn begin_transaction(&mut self) -> Result<(), DatabaseError>;

    fn commit(&mut self) -> Result<(), DatabaseError>;

    fn rollback(&mut self) -> Result<(), DatabaseError>;

    fn in_transaction(&self) -> bool;
}
