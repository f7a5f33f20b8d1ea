//! Named database connections.
//!
//! A [`Database`] owns one [`Executor`], a set of parameters (engine, charset,
//! collation defaults for new tables) and the transaction nesting state.
//!
//! # Examples
//!
//! ```no_run
//! use schemasync::database::Database;
//! use schemasync::executor::DatabaseError;
//!
//! # fn example(db: &mut Database) -> Result<(), DatabaseError> {
//! db.transaction(|db| {
//!     db.execute("INSERT INTO products (name) VALUES (?)", &["Pen".into()])?;
//!
//!     // Nested levels become savepoints.
//!     db.begin()?;
//!     db.execute("DELETE FROM products", &[])?;
//!     db.rollback()?;
//!     Ok::<_, DatabaseError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

use serde_json::{Map, Value};
use std::fmt;
use std::time::Instant;

use crate::executor::{DatabaseError, Executor};
use crate::transaction::{TransactionAction, TransactionNesting};
use crate::Row;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

pub struct Database {
    name: String,
    executor: Box<dyn Executor>,
    parameters: Map<String, Value>,
    nesting: TransactionNesting,
}

impl Database {
    pub fn new(name: impl Into<String>, executor: impl Executor + 'static) -> Self {
        Self::from_boxed(name, Box::new(executor))
    }

    pub fn from_boxed(name: impl Into<String>, executor: Box<dyn Executor>) -> Self {
        let nesting = TransactionNesting::for_driver(executor.driver_name());
        Self {
            name: name.into(),
            executor,
            parameters: Map::new(),
            nesting,
        }
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_name(&self) -> &str {
        self.executor.driver_name()
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Runs a statement with positional bindings. Booleans are bound as `1`/`0`.
    pub fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<u64, DatabaseError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_statement_span(sql).entered();

        log::debug!("[{}] {} {:?}", self.name, sql, bindings);
        let bindings = prepare_bindings(bindings);
        let start = Instant::now();
        let result = self.executor.execute(sql, &bindings);
        record(start, result.is_ok());
        result
    }

    /// Runs a query and returns its rows.
    pub fn query(&mut self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_statement_span(sql).entered();

        log::debug!("[{}] {} {:?}", self.name, sql, bindings);
        let bindings = prepare_bindings(bindings);
        let start = Instant::now();
        let result = self.executor.query(sql, &bindings);
        record(start, result.is_ok());
        result
    }

    /// Opens a transaction, or a savepoint when one is already open.
    pub fn begin(&mut self) -> Result<bool, DatabaseError> {
        let action = self.nesting.begin();
        match self.apply(action) {
            Ok(done) => Ok(done),
            Err(err) => {
                self.nesting.unwind();
                Err(err)
            }
        }
    }

    /// Commits the innermost level.
    pub fn commit(&mut self) -> Result<bool, DatabaseError> {
        let action = self.nesting.commit()?;
        self.apply(action)
    }

    /// Rolls back the innermost level.
    pub fn rollback(&mut self) -> Result<bool, DatabaseError> {
        let action = self.nesting.rollback()?;
        self.apply(action)
    }

    fn apply(&mut self, action: TransactionAction) -> Result<bool, DatabaseError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::transaction_span(&action).entered();

        log::debug!(
            "[{}] transaction {:?} (level {})",
            self.name,
            action,
            self.nesting.level()
        );
        match action {
            TransactionAction::Begin => self.executor.begin_transaction()?,
            TransactionAction::Commit => self.executor.commit()?,
            TransactionAction::Rollback => self.executor.rollback()?,
            TransactionAction::Noop => {}
            savepoint => {
                if let Some(sql) = savepoint.sql() {
                    self.executor.execute(&sql, &[])?;
                }
            }
        }
        Ok(true)
    }

    /// Whether the underlying connection has an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.executor.in_transaction()
    }

    pub fn transaction_level(&self) -> u32 {
        self.nesting.level()
    }

    pub fn supports_nested_transactions(&self) -> bool {
        self.nesting.supports_savepoints()
    }

    /// Runs `body` inside a transaction level.
    ///
    /// The level is committed when `body` succeeds and rolled back when it
    /// fails, in both cases only if the connection is still in a transaction
    /// (the body may have closed it itself). The body's error is always
    /// returned, even when the rollback fails too.
    pub fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Database) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        self.begin()?;

        match body(self) {
            Ok(value) => {
                if self.in_transaction() {
                    self.commit()?;
                } else {
                    self.settle();
                }
                Ok(value)
            }
            Err(err) => {
                if self.in_transaction() {
                    if let Err(rollback_err) = self.rollback() {
                        log::warn!("[{}] rollback failed: {}", self.name, rollback_err);
                    }
                } else {
                    self.settle();
                }
                Err(err)
            }
        }
    }

    /// The engine ended the transaction on its own, e.g. through an
    /// implicitly committing statement. Open levels no longer exist.
    fn settle(&mut self) {
        if self.nesting.level() > 0 {
            log::debug!(
                "[{}] transaction closed by the engine at level {}",
                self.name,
                self.nesting.level()
            );
            self.nesting.reset();
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("driver", &self.executor.driver_name())
            .field("parameters", &self.parameters)
            .field("level", &self.nesting.level())
            .finish()
    }
}

fn prepare_bindings(bindings: &[Value]) -> Vec<Value> {
    bindings
        .iter()
        .map(|value| match value {
            Value::Bool(b) => Value::from(u8::from(*b)),
            other => other.clone(),
        })
        .collect()
}

#[allow(unused_variables)]
fn record(start: Instant, ok: bool) {
    #[cfg(feature = "metrics")]
    {
        METRICS.record_statement(start.elapsed());
        if !ok {
            METRICS.record_statement_error();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use serde_json::json;

    fn database(driver: &str) -> (Database, MockExecutor) {
        let mock = MockExecutor::new(driver);
        (Database::new("test", mock.clone()), mock)
    }

    #[test]
    fn test_execute_converts_bool_bindings() {
        let (mut db, mock) = database("mysql");
        db.execute("INSERT INTO t (a, b) VALUES (?, ?)", &[json!(true), json!("x")])
            .unwrap();
        assert_eq!(mock.executed()[0].1, vec![json!(1), json!("x")]);
    }

    #[test]
    fn test_parameters() {
        let (db, _) = database("mysql");
        let db = db.with_parameter("engine", "InnoDB");
        assert_eq!(db.parameter("engine"), Some(&json!("InnoDB")));
        assert_eq!(db.parameter("charset"), None);
        assert_eq!(db.driver_name(), "mysql");
        assert_eq!(db.name(), "test");
    }

    #[test]
    fn test_nested_begin_uses_savepoints() {
        let (mut db, mock) = database("mysql");
        assert!(db.supports_nested_transactions());
        db.begin().unwrap();
        db.begin().unwrap();
        assert_eq!(db.transaction_level(), 2);
        db.rollback().unwrap();
        db.commit().unwrap();
        assert_eq!(db.transaction_level(), 0);
        assert!(!db.in_transaction());

        let sql: Vec<String> = mock.executed().into_iter().map(|(sql, _)| sql).collect();
        assert_eq!(sql, ["SAVEPOINT LEVEL1", "ROLLBACK TO SAVEPOINT LEVEL1"]);
        assert_eq!(mock.transaction_log(), ["BEGIN", "COMMIT"]);
    }

    #[test]
    fn test_nested_rollback_discards_only_inner_work() {
        let (mut db, mock) = database("mysql");
        db.begin().unwrap();
        db.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
        db.begin().unwrap();
        db.execute("INSERT INTO t VALUES (2)", &[]).unwrap();
        db.rollback().unwrap();
        db.commit().unwrap();

        assert_eq!(mock.committed(), ["INSERT INTO t VALUES (1)"]);
    }

    #[test]
    fn test_nested_begin_without_savepoints_is_counted() {
        let (mut db, mock) = database("sqlite");
        assert!(!db.supports_nested_transactions());
        db.begin().unwrap();
        db.begin().unwrap();
        assert_eq!(db.transaction_level(), 2);
        db.commit().unwrap();
        assert!(db.in_transaction());
        db.commit().unwrap();
        assert!(!db.in_transaction());
        assert!(mock.executed().is_empty());
    }

    #[test]
    fn test_commit_without_transaction() {
        let (mut db, _) = database("mysql");
        assert!(matches!(db.commit(), Err(DatabaseError::NoActiveTransaction)));
        assert!(matches!(db.rollback(), Err(DatabaseError::NoActiveTransaction)));
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let (mut db, mock) = database("mysql");
        let value = db
            .transaction(|db| {
                db.execute("INSERT INTO t VALUES (1)", &[])?;
                Ok::<_, DatabaseError>(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(mock.committed(), ["INSERT INTO t VALUES (1)"]);
        assert_eq!(db.transaction_level(), 0);
    }

    #[test]
    fn test_transaction_rolls_back_and_reraises() {
        let (mut db, mock) = database("mysql");
        mock.fail_on("INSERT INTO t VALUES (2)");
        let result = db.transaction(|db| {
            db.execute("INSERT INTO t VALUES (1)", &[])?;
            db.execute("INSERT INTO t VALUES (2)", &[])?;
            Ok::<_, DatabaseError>(())
        });
        assert!(matches!(result, Err(DatabaseError::Query { .. })));
        assert!(mock.committed().is_empty());
        assert_eq!(mock.transaction_log(), ["BEGIN", "ROLLBACK"]);
        assert_eq!(db.transaction_level(), 0);
    }

    #[test]
    fn test_transaction_body_may_close_itself() {
        let (mut db, mock) = database("mysql");
        db.transaction(|db| {
            db.execute("INSERT INTO t VALUES (1)", &[])?;
            db.commit()?;
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
        assert_eq!(mock.transaction_log(), ["BEGIN", "COMMIT"]);
        assert_eq!(db.transaction_level(), 0);
    }

    #[test]
    fn test_transaction_after_implicit_commit() {
        let (mut db, mock) = database("mysql");
        db.transaction(|db| {
            db.execute("INSERT INTO t VALUES (1)", &[])?;
            db.execute("CREATE TABLE u (id int)", &[])?;
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
        assert_eq!(
            mock.committed(),
            ["INSERT INTO t VALUES (1)", "CREATE TABLE u (id int)"]
        );
        assert_eq!(mock.transaction_log(), ["BEGIN"]);
        assert_eq!(db.transaction_level(), 0);
    }
}
