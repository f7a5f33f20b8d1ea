use serde_json::Value;

use crate::schema::Table;

/// One unit of work produced by a grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    bindings: Vec<Value>,
    transactionable: bool,
}

impl Statement {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>, transactionable: bool) -> Self {
        Self {
            sql: sql.into(),
            bindings,
            transactionable,
        }
    }

    /// Statement safe to run inside a transaction.
    pub fn transactional(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new(), true)
    }

    /// Statement that would implicitly commit an open transaction.
    pub fn standalone(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new(), false)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn is_transactionable(&self) -> bool {
        self.transactionable
    }
}

/// Ordered statements of one diff plus the table state they lead to.
#[derive(Debug, Clone)]
pub struct Statements {
    statements: Vec<Statement>,
    table: Table,
}

impl Statements {
    pub fn new(statements: Vec<Statement>, table: Table) -> Self {
        Self { statements, table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Statements that must run outside any transaction, in order.
    pub fn standalone(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| !s.is_transactionable())
    }

    /// Statements that may share one transaction, in order.
    pub fn transactional(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| s.is_transactionable())
    }

    pub fn into_parts(self) -> (Vec<Statement>, Table) {
        (self.statements, self.table)
    }
}

impl<'a> IntoIterator for &'a Statements {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
