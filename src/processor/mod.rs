//! Schema processing.
//!
//! A [`Processor`] converges one database table towards a declared
//! [`Table`]. The MySQL implementation reads the live table through a
//! [`Storage`], diffs it with a [`Grammar`] and runs the resulting
//! [`Statements`].
//!
//! ```no_run
//! use schemasync::database::Database;
//! use schemasync::processor::{MySqlProcessor, Processor};
//! use schemasync::schema::Table;
//!
//! # fn example(db: &mut Database) -> Result<(), schemasync::processor::ProcessError> {
//! let mut table = Table::new("products");
//! table.primary("id");
//! table.string("name").length(100);
//!
//! MySqlProcessor::new().process(&table, db)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod grammar;
pub mod mysql;
pub mod registry;
pub mod statement;
pub mod storage;
pub mod type_mapping;

pub use error::{GrammarError, ProcessError, StorageFetchError, StorageStoreError};
pub use grammar::MySqlGrammar;
pub use mysql::MySqlProcessor;
pub use registry::{Processors, Storages};
pub use statement::{Statement, Statements};
pub use storage::MySqlStorage;

use crate::database::Database;
use crate::schema::Table;

/// Computes the statements converging `current` into `table`.
///
/// `current` is `None` when the table does not exist yet. Implementations must
/// not mutate either argument.
pub trait Grammar: Send + Sync {
    fn create_statements(
        &self,
        table: &Table,
        current: Option<&Table>,
    ) -> Result<Statements, GrammarError>;
}

/// Reads tables back from a database.
pub trait Storage: Send + Sync {
    fn supports(&self, database: &Database) -> bool;

    /// The live table, `None` when it does not exist.
    fn fetch_table(
        &self,
        database: &mut Database,
        name: &str,
    ) -> Result<Option<Table>, StorageFetchError>;

    /// Records the table state after a run. Called inside the processing
    /// transaction.
    fn store_table(&self, database: &mut Database, table: &Table) -> Result<(), StorageStoreError>;
}

/// Converges a database table towards a declared one.
pub trait Processor: Send + Sync {
    fn supports(&self, database: &Database) -> bool;

    fn process(&self, table: &Table, database: &mut Database) -> Result<(), ProcessError>;

    /// Statements `process` would run, without running them.
    fn plan(&self, table: &Table, database: &mut Database) -> Result<Statements, ProcessError>;
}
