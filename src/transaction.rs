//! Transaction nesting.
//!
//! Engines offer one flat transaction per connection. Nesting is emulated
//! with savepoints named after the depth they were opened at: the first
//! nested `begin` issues `SAVEPOINT LEVEL1`, the matching `commit` releases
//! it and a `rollback` rolls back to it.
//!
//! [`TransactionNesting`] only tracks depth and decides what to do; the
//! [`Database`](crate::database::Database) carries the decision out.

use crate::executor::DatabaseError;

/// Drivers whose engines understand `SAVEPOINT`.
pub const SAVEPOINT_DRIVERS: [&str; 2] = ["mysql", "pgsql"];

/// What a transaction call has to do on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAction {
    Begin,
    Commit,
    Rollback,
    Savepoint(String),
    ReleaseSavepoint(String),
    RollbackToSavepoint(String),
    /// Nested level on an engine without savepoints.
    Noop,
}

impl TransactionAction {
    /// Statement text for savepoint actions.
    pub fn sql(&self) -> Option<String> {
        match self {
            TransactionAction::Savepoint(name) => Some(format!("SAVEPOINT {name}")),
            TransactionAction::ReleaseSavepoint(name) => Some(format!("RELEASE SAVEPOINT {name}")),
            TransactionAction::RollbackToSavepoint(name) => {
                Some(format!("ROLLBACK TO SAVEPOINT {name}"))
            }
            _ => None,
        }
    }
}

/// Depth counter for one connection.
#[derive(Debug, Clone)]
pub struct TransactionNesting {
    level: u32,
    savepoints: bool,
}

impl TransactionNesting {
    pub fn new(savepoints: bool) -> Self {
        Self {
            level: 0,
            savepoints,
        }
    }

    /// Nesting for a driver, with savepoints if the driver supports them.
    pub fn for_driver(driver: &str) -> Self {
        Self::new(SAVEPOINT_DRIVERS.contains(&driver))
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn supports_savepoints(&self) -> bool {
        self.savepoints
    }

    pub fn begin(&mut self) -> TransactionAction {
        let action = match self.level {
            0 => TransactionAction::Begin,
            level if self.savepoints => TransactionAction::Savepoint(savepoint_name(level)),
            _ => TransactionAction::Noop,
        };
        self.level += 1;
        action
    }

    pub fn commit(&mut self) -> Result<TransactionAction, DatabaseError> {
        self.close(TransactionAction::Commit, TransactionAction::ReleaseSavepoint)
    }

    pub fn rollback(&mut self) -> Result<TransactionAction, DatabaseError> {
        self.close(TransactionAction::Rollback, TransactionAction::RollbackToSavepoint)
    }

    fn close(
        &mut self,
        outermost: TransactionAction,
        nested: fn(String) -> TransactionAction,
    ) -> Result<TransactionAction, DatabaseError> {
        self.level = self
            .level
            .checked_sub(1)
            .ok_or(DatabaseError::NoActiveTransaction)?;
        Ok(match self.level {
            0 => outermost,
            level if self.savepoints => nested(savepoint_name(level)),
            _ => TransactionAction::Noop,
        })
    }

    /// Undo a `begin` the connection refused.
    pub fn unwind(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Forget all open levels, e.g. after the engine ended the transaction
    /// on its own.
    pub fn reset(&mut self) {
        self.level = 0;
    }
}

fn savepoint_name(level: u32) -> String {
    format!("LEVEL{level}")
}
