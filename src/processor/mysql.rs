use std::sync::Arc;

use serde_json::Value;

use super::error::ProcessError;
use super::grammar::{MySqlGrammar, DEFAULT_CHARSET, DEFAULT_COLLATION, DEFAULT_ENGINE};
use super::statement::Statements;
use super::storage::MySqlStorage;
use super::{Grammar, Processor, Storage};
use crate::database::Database;
use crate::schema::Table;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Table parameters taken from the database when a table does not set them.
const TABLE_DEFAULTS: [(&str, &str); 3] = [
    ("engine", DEFAULT_ENGINE),
    ("charset", DEFAULT_CHARSET),
    ("collation", DEFAULT_COLLATION),
];

/// Processor for MySQL databases.
///
/// `CREATE TABLE` and `DROP TABLE` commit implicitly on MySQL, so they run on
/// their own before everything else is applied in one transaction.
#[derive(Clone)]
pub struct MySqlProcessor {
    storage: Arc<dyn Storage>,
    grammar: Arc<dyn Grammar>,
}

impl Default for MySqlProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlProcessor {
    pub fn new() -> Self {
        Self::with_storage(MySqlStorage::new())
    }

    /// Processor reading and recording tables through `storage`.
    pub fn with_storage(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
            grammar: Arc::new(MySqlGrammar::new()),
        }
    }

    fn check(&self, database: &Database) -> Result<(), ProcessError> {
        if self.supports(database) {
            return Ok(());
        }
        Err(ProcessError::Unsupported {
            database: database.name().to_string(),
            driver: database.driver_name().to_string(),
        })
    }

    /// Copy of `table` carrying the database's table defaults where unset.
    fn prepare(&self, table: &Table, database: &Database) -> Table {
        let mut table = table.clone();
        for (name, fallback) in TABLE_DEFAULTS {
            if table.get_parameter(name).is_none() {
                let value = database
                    .parameter(name)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or_else(|| Value::from(fallback));
                table.parameter(name, value);
            }
        }
        table
    }

    fn diff(&self, table: &Table, database: &mut Database) -> Result<Statements, ProcessError> {
        let current = self.storage.fetch_table(database, table.name())?;
        Ok(self.grammar.create_statements(table, current.as_ref())?)
    }

    fn run(&self, table: &Table, database: &mut Database) -> Result<usize, ProcessError> {
        let table = self.prepare(table, database);
        let statements = self.diff(&table, database)?;

        for statement in statements.standalone() {
            database.execute(statement.sql(), statement.bindings())?;
        }

        if table.is_dropping() {
            self.storage.store_table(database, statements.table())?;
            return Ok(statements.len());
        }

        database.transaction(|db| {
            for statement in statements.transactional() {
                db.execute(statement.sql(), statement.bindings())?;
            }
            self.storage.store_table(db, statements.table())?;
            Ok::<_, ProcessError>(())
        })?;
        Ok(statements.len())
    }
}

impl Processor for MySqlProcessor {
    fn supports(&self, database: &Database) -> bool {
        database.driver_name() == "mysql"
    }

    fn process(&self, table: &Table, database: &mut Database) -> Result<(), ProcessError> {
        self.check(database)?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::process_span(table.name(), database.name()).entered();

        let result = self.run(table, database);

        #[cfg(feature = "metrics")]
        METRICS.record_process(result.is_ok());

        match result {
            Ok(count) => {
                log::info!(
                    "Processed table `{}` on `{}` ({} statements)",
                    table.name(),
                    database.name(),
                    count
                );
                Ok(())
            }
            Err(err) => {
                log::error!(
                    "Processing table `{}` on `{}` failed: {}",
                    table.name(),
                    database.name(),
                    err
                );
                Err(err)
            }
        }
    }

    fn plan(&self, table: &Table, database: &mut Database) -> Result<Statements, ProcessError> {
        self.check(database)?;
        let table = self.prepare(table, database);
        self.diff(&table, database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ER_NO_SUCH_TABLE;
    use crate::mock::MockExecutor;
    use crate::processor::StorageStoreError;
    use serde_json::json;
    use std::sync::Mutex;

    fn missing_table(mock: &MockExecutor) {
        mock.on_query_error(
            "SHOW FULL COLUMNS",
            Some(ER_NO_SUCH_TABLE),
            "Table 'app.products' doesn't exist",
        );
    }

    fn products() -> Table {
        let mut table = Table::new("products");
        table.primary("id");
        table.string("name").length(30);
        table
    }

    #[test]
    fn test_creates_missing_table() {
        let mock = MockExecutor::new("mysql");
        missing_table(&mock);
        let mut db = Database::new("shop", mock.clone());

        MySqlProcessor::new().process(&products(), &mut db).unwrap();

        assert_eq!(
            mock.statements(),
            ["CREATE TABLE IF NOT EXISTS `products` (`id` int(11) UNSIGNED AUTO_INCREMENT,`name` varchar(30) NULL, PRIMARY KEY (`id`)) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"]
        );
        // The transactional phase still opens and commits.
        assert_eq!(mock.transaction_log(), ["BEGIN", "COMMIT"]);
        assert_eq!(db.transaction_level(), 0);
    }

    #[test]
    fn test_database_parameters_fill_table_defaults() {
        let mock = MockExecutor::new("mysql");
        missing_table(&mock);
        let mut db = Database::new("shop", mock.clone())
            .with_parameter("engine", "MyISAM")
            .with_parameter("charset", "latin1");

        let mut table = products();
        table.parameter("charset", "utf8");
        MySqlProcessor::new().process(&table, &mut db).unwrap();

        let create = &mock.statements()[0];
        assert!(create.ends_with("ENGINE=MyISAM DEFAULT CHARSET=utf8 COLLATE=utf8mb4_unicode_ci"));
        // The caller's table is left alone.
        assert!(table.get_parameter("engine").is_none());
    }

    #[test]
    fn test_transactional_failure_rolls_back() {
        let mock = MockExecutor::new("mysql");
        missing_table(&mock);
        mock.fail_on("ADD KEY");
        let mut db = Database::new("shop", mock.clone());

        let mut table = products();
        table.index("name_idx").column("name");
        table.items(vec![json!({"name": "pen"}).as_object().cloned().unwrap()]);

        let err = MySqlProcessor::new().process(&table, &mut db).unwrap_err();
        assert!(matches!(err, ProcessError::Database(_)));
        assert_eq!(mock.transaction_log(), ["BEGIN", "ROLLBACK"]);
        // CREATE TABLE ran on its own and stays.
        assert_eq!(mock.committed().len(), 1);
        assert!(mock.committed()[0].starts_with("CREATE TABLE"));
        assert!(!mock.statements().iter().any(|s| s.starts_with("INSERT")));
    }

    #[test]
    fn test_drop_skips_transaction() {
        let mock = MockExecutor::new("mysql");
        let mut db = Database::new("shop", mock.clone());

        let mut table = Table::new("products");
        table.drop_table();
        MySqlProcessor::new().process(&table, &mut db).unwrap();

        assert_eq!(mock.statements(), ["DROP TABLE IF EXISTS `products`"]);
        assert!(mock.transaction_log().is_empty());
    }

    #[test]
    fn test_unsupported_database() {
        let mock = MockExecutor::new("sqlite");
        let mut db = Database::new("local", mock.clone());
        let processor = MySqlProcessor::new();

        assert!(!processor.supports(&db));
        assert!(matches!(
            processor.process(&products(), &mut db),
            Err(ProcessError::Unsupported { .. })
        ));
        assert!(mock.queries().is_empty());
    }

    #[test]
    fn test_plan_does_not_execute() {
        let mock = MockExecutor::new("mysql");
        missing_table(&mock);
        let mut db = Database::new("shop", mock.clone());

        let statements = MySqlProcessor::new().plan(&products(), &mut db).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(mock.statements().is_empty());
        assert!(mock.transaction_log().is_empty());
    }

    struct RecordingStorage {
        stored: Arc<Mutex<Vec<(String, u32)>>>,
    }

    impl Storage for RecordingStorage {
        fn supports(&self, _database: &Database) -> bool {
            true
        }

        fn fetch_table(
            &self,
            _database: &mut Database,
            _name: &str,
        ) -> Result<Option<Table>, crate::processor::StorageFetchError> {
            Ok(None)
        }

        fn store_table(
            &self,
            database: &mut Database,
            table: &Table,
        ) -> Result<(), StorageStoreError> {
            self.stored
                .lock()
                .unwrap()
                .push((table.name().to_string(), database.transaction_level()));
            Ok(())
        }
    }

    #[test]
    fn test_store_runs_inside_transaction_with_next_state() {
        let stored = Arc::new(Mutex::new(Vec::new()));
        let processor = MySqlProcessor::with_storage(RecordingStorage {
            stored: stored.clone(),
        });
        let mock = MockExecutor::new("mysql");
        let mut db = Database::new("shop", mock);

        let mut table = products();
        table.rename_table("goods");
        processor.process(&table, &mut db).unwrap();

        let stored = stored.lock().unwrap();
        assert_eq!(*stored, [("goods".to_string(), 1)]);
    }
}
