//! Migration-specific error types

use thiserror::Error;

use crate::processor::ProcessError;

/// An install or uninstall action failed.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Database action `{action}` on table `{table}` failed: {source}")]
    Failed {
        action: String,
        table: String,
        #[source]
        source: ProcessError,
    },
}

impl ActionError {
    /// Name of the failed action.
    pub fn action(&self) -> &str {
        match self {
            ActionError::Failed { action, .. } => action,
        }
    }
}
