use thiserror::Error;

use crate::executor::DatabaseError;
use crate::schema::ColumnType;

/// The diff could not be computed.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("Unsupported column type `{column_type}` for column `{column}`")]
    UnsupportedColumnType {
        column: String,
        column_type: ColumnType,
    },

    #[error("Cannot rename column `{from}` to `{to}` of table `{table}`: column does not exist")]
    RenameUnknownColumn {
        table: String,
        from: String,
        to: String,
    },
}

/// The current table could not be read from the database.
#[derive(Debug, Error)]
pub enum StorageFetchError {
    #[error("No storage supports database `{database}` (driver `{driver}`)")]
    Unsupported { database: String, driver: String },

    #[error("Failed to fetch table `{table}`: {source}")]
    Query {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Unresolvable type `{native}` of column `{column}` in table `{table}`")]
    UnresolvableType {
        table: String,
        column: String,
        native: String,
    },
}

/// The table state could not be stored.
#[derive(Debug, Error)]
pub enum StorageStoreError {
    #[error("No storage supports database `{database}` (driver `{driver}`)")]
    Unsupported { database: String, driver: String },

    #[error("Failed to store table `{table}`: {source}")]
    Query {
        table: String,
        #[source]
        source: DatabaseError,
    },
}

/// A processing run failed. Carries the cause.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No processor supports database `{database}` (driver `{driver}`)")]
    Unsupported { database: String, driver: String },

    #[error("Processing failed: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Processing failed: {0}")]
    Fetch(#[from] StorageFetchError),

    #[error("Processing failed: {0}")]
    Store(#[from] StorageStoreError),

    #[error("Processing failed: {0}")]
    Database(#[from] DatabaseError),
}

impl ProcessError {
    /// Multi-line report with the cause chain, for CLI output.
    pub fn format_detailed(&self) -> String {
        let mut report = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            report.push_str("\n  caused by: ");
            report.push_str(&cause.to_string());
            source = cause.source();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_keeps_cause() {
        let err = ProcessError::from(StorageFetchError::Query {
            table: "products".into(),
            source: DatabaseError::query("gone away"),
        });
        assert_eq!(
            err.to_string(),
            "Processing failed: Failed to fetch table `products`: Query error: gone away"
        );
        let cause = std::error::Error::source(&err).map(|c| c.to_string());
        assert_eq!(
            cause.as_deref(),
            Some("Failed to fetch table `products`: Query error: gone away")
        );
        assert!(err.format_detailed().contains("caused by: Query error: gone away"));
    }

    #[test]
    fn test_grammar_error_display() {
        let err = GrammarError::RenameUnknownColumn {
            table: "products".into(),
            from: "id".into(),
            to: "new_id".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot rename column `id` to `new_id` of table `products`: column does not exist"
        );
    }
}
