//! # schemasync
//!
//! Declarative MySQL schema synchronization. Describe a table, hand it to a
//! processor and the live database is diffed and converged towards it: new
//! tables are created, columns and indexes added, changed, renamed or
//! dropped, and seed rows inserted. Nothing is recorded besides the schema
//! itself, so every run is computed fresh.
//!
//! See the README for configuration and the CLI.

pub mod config;
pub mod connection;
pub mod database;
pub mod databases;
pub mod executor;
pub mod metrics;
pub mod migration;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod processor;
pub mod schema;
pub mod transaction;

/// A result row or seed item, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub use serde_json::Value;

pub use config::DatabaseConfig;
pub use database::Database;
pub use databases::Databases;
pub use executor::{DatabaseError, Executor};
pub use processor::{MySqlProcessor, Processor, ProcessError, Processors};
pub use schema::Table;
