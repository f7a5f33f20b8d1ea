//! In-memory [`Executor`] for tests.
//!
//! `MockExecutor` records every statement and simulates the transactional
//! behavior of a MySQL connection: work done inside a transaction becomes
//! durable on commit, savepoints cut pending work, and table DDL commits
//! implicitly. Queries answer with scripted rows or errors.
//!
//! Clones share state, so a test can hand one clone to a
//! [`Database`](crate::database::Database) and inspect the other.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::executor::{DatabaseError, Executor};
use crate::{Row, Value};

/// Statement prefixes that end an open transaction before they run.
pub const IMPLICIT_COMMIT_PREFIXES: [&str; 2] = ["CREATE TABLE", "DROP TABLE"];

type Scripted = Result<Vec<Row>, (Option<u16>, String)>;

#[derive(Default)]
struct MockState {
    executed: Vec<(String, Vec<Value>)>,
    queries: Vec<String>,
    committed: Vec<String>,
    pending: Vec<String>,
    savepoints: Vec<(String, usize)>,
    in_transaction: bool,
    transaction_log: Vec<&'static str>,
    failures: Vec<String>,
    scripted: Vec<(String, Scripted)>,
}

impl MockState {
    fn commit_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.committed.extend(pending);
        self.savepoints.clear();
        self.in_transaction = false;
    }

    fn check_failure(&self, sql: &str) -> Result<(), DatabaseError> {
        match self.failures.iter().find(|pattern| sql.contains(pattern.as_str())) {
            Some(pattern) => Err(DatabaseError::query(format!("mock failure on `{pattern}`"))),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct MockExecutor {
    driver: String,
    state: Arc<Mutex<MockState>>,
}

impl MockExecutor {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test must not hide the state from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail every statement or query containing `pattern`.
    pub fn fail_on(&self, pattern: impl Into<String>) -> &Self {
        self.state().failures.push(pattern.into());
        self
    }

    /// Answer queries starting with `prefix` with `rows`. Later scripts for
    /// the same prefix win.
    pub fn on_query(&self, prefix: impl Into<String>, rows: Vec<Row>) -> &Self {
        self.state().scripted.insert(0, (prefix.into(), Ok(rows)));
        self
    }

    /// Answer queries starting with `prefix` with an engine error.
    pub fn on_query_error(
        &self,
        prefix: impl Into<String>,
        code: Option<u16>,
        message: impl Into<String>,
    ) -> &Self {
        self.state()
            .scripted
            .insert(0, (prefix.into(), Err((code, message.into()))));
        self
    }

    /// Statements run through `execute`, with their bindings.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state().executed.clone()
    }

    /// Statements run through `execute`, without savepoint bookkeeping.
    pub fn statements(&self) -> Vec<String> {
        self.state()
            .executed
            .iter()
            .map(|(sql, _)| sql.clone())
            .filter(|sql| !is_savepoint(sql))
            .collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }

    /// Statements whose effect is durable.
    pub fn committed(&self) -> Vec<String> {
        self.state().committed.clone()
    }

    /// `BEGIN`, `COMMIT` and `ROLLBACK` calls in order.
    pub fn transaction_log(&self) -> Vec<&'static str> {
        self.state().transaction_log.clone()
    }
}

fn is_savepoint(sql: &str) -> bool {
    sql.starts_with("SAVEPOINT ")
        || sql.starts_with("RELEASE SAVEPOINT ")
        || sql.starts_with("ROLLBACK TO SAVEPOINT ")
}

impl Executor for MockExecutor {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn execute(&mut self, sql: &str, bindings: &[Value]) -> Result<u64, DatabaseError> {
        let mut state = self.state();
        state.check_failure(sql)?;
        state.executed.push((sql.to_string(), bindings.to_vec()));

        if let Some(name) = sql.strip_prefix("SAVEPOINT ") {
            let mark = state.pending.len();
            state.savepoints.push((name.to_string(), mark));
        } else if let Some(name) = sql.strip_prefix("RELEASE SAVEPOINT ") {
            if let Some(at) = state.savepoints.iter().position(|(n, _)| n == name) {
                state.savepoints.truncate(at);
            }
        } else if let Some(name) = sql.strip_prefix("ROLLBACK TO SAVEPOINT ") {
            let at = state
                .savepoints
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| DatabaseError::query(format!("SAVEPOINT {name} does not exist")))?;
            let mark = state.savepoints[at].1;
            state.pending.truncate(mark);
            state.savepoints.truncate(at + 1);
        } else if IMPLICIT_COMMIT_PREFIXES.iter().any(|p| sql.starts_with(p)) {
            state.commit_pending();
            state.committed.push(sql.to_string());
        } else if state.in_transaction {
            state.pending.push(sql.to_string());
        } else {
            state.committed.push(sql.to_string());
        }
        Ok(1)
    }

    fn query(&mut self, sql: &str, _bindings: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        let mut state = self.state();
        state.check_failure(sql)?;
        state.queries.push(sql.to_string());

        match state.scripted.iter().find(|(prefix, _)| sql.starts_with(prefix.as_str())) {
            Some((_, Ok(rows))) => Ok(rows.clone()),
            Some((_, Err((code, message)))) => Err(DatabaseError::Query {
                code: *code,
                message: message.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn begin_transaction(&mut self) -> Result<(), DatabaseError> {
        let mut state = self.state();
        if state.in_transaction {
            return Err(DatabaseError::query("There is already an active transaction"));
        }
        state.in_transaction = true;
        state.transaction_log.push("BEGIN");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DatabaseError> {
        let mut state = self.state();
        if !state.in_transaction {
            return Err(DatabaseError::NoActiveTransaction);
        }
        state.commit_pending();
        state.transaction_log.push("COMMIT");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DatabaseError> {
        let mut state = self.state();
        if !state.in_transaction {
            return Err(DatabaseError::NoActiveTransaction);
        }
        state.pending.clear();
        state.savepoints.clear();
        state.in_transaction = false;
        state.transaction_log.push("ROLLBACK");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state().in_transaction
    }
}
