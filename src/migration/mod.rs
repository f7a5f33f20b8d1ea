//! Install/uninstall migrations built from table declarations.
//!
//! There is no migration ledger: installing a table converges the database
//! towards it, uninstalling drops it. Both can run any number of times.

pub mod action;
pub mod error;
pub mod table_migration;

pub use action::{Action, Actions, DatabaseAction, DatabaseDeleteAction};
pub use error::ActionError;
pub use table_migration::TableMigration;

/// A set of actions to install, and to uninstall, one feature's tables.
pub trait Migration: Send + Sync {
    fn description(&self) -> &str;

    fn install(&self) -> Actions;

    fn uninstall(&self) -> Actions;
}
