//! MySQL diff engine.
//!
//! [`MySqlGrammar`] compares a desired [`Table`] with the one found in the
//! database and compiles the statements converging one into the other.
//! Statements come out in a fixed order:
//!
//! 1. `CREATE TABLE` (standalone)
//! 2. `ADD COLUMN` for columns missing from the current table
//! 3. `CHANGE COLUMN` for renamed and changed columns
//! 4. `DROP COLUMN`
//! 5. index drops and additions
//! 6. `TRUNCATE`
//! 7. seed `INSERT`s
//! 8. table `RENAME`
//! 9. `DROP TABLE` (standalone)
//!
//! Standalone statements implicitly commit on MySQL and are run outside the
//! processing transaction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use super::error::GrammarError;
use super::statement::{Statement, Statements};
use super::type_mapping::{mysql_type, needs_type_hint, TYPE_HINT_PREFIX};
use super::Grammar;
use crate::schema::{Column, ColumnKind, ColumnType, Index, Table};

/// Engine of new tables without an `engine` parameter.
pub const DEFAULT_ENGINE: &str = "InnoDB";
/// Charset of new tables without a `charset` parameter.
pub const DEFAULT_CHARSET: &str = "utf8mb4";
/// Collation of new tables without a `collation` parameter.
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid numeric pattern")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlGrammar;

/// Columns of a diff, sorted by what happens to them.
#[derive(Default)]
struct ColumnPlan<'a> {
    create: Vec<&'a Column>,
    new: Vec<&'a Column>,
    /// `(name in the current table, column as it should be)`.
    update: Vec<(String, Column)>,
    delete: Vec<&'a str>,
}

impl MySqlGrammar {
    pub fn new() -> Self {
        Self
    }

    fn plan_columns<'a>(
        &self,
        table: &'a Table,
        current: Option<&Table>,
    ) -> Result<ColumnPlan<'a>, GrammarError> {
        let mut plan = ColumnPlan::default();

        for column in table.columns() {
            match column.kind() {
                ColumnKind::Rename { to } => {
                    match current.and_then(|c| c.get_column(column.name())) {
                        Some(existing) => plan
                            .update
                            .push((existing.name().to_string(), existing.with_name(to.as_str()))),
                        // Renamed on an earlier run.
                        None if current.is_some_and(|c| c.has_column(to)) => {}
                        None => {
                            return Err(GrammarError::RenameUnknownColumn {
                                table: table.name().to_string(),
                                from: column.name().to_string(),
                                to: to.clone(),
                            })
                        }
                    }
                }
                ColumnKind::Drop => {
                    if current.is_some_and(|c| c.has_column(column.name())) {
                        plan.delete.push(column.name());
                    }
                }
                ColumnKind::Field(column_type) => {
                    let Some(current) = current else {
                        plan.create.push(column);
                        continue;
                    };
                    // Key columns are only ever set up on creation.
                    if column_type.is_primary() {
                        continue;
                    }
                    match current.get_column(column.name()) {
                        None => plan.new.push(column),
                        Some(existing) if existing.is_primary() => {}
                        Some(existing) => {
                            if !self.same_definition(column, existing)? {
                                plan.update.push((column.name().to_string(), column.clone()));
                            }
                        }
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Whether altering `current` into `desired` would be a no-op.
    ///
    /// Charset and collation only count when both sides carry them, numeric
    /// defaults compare by value and a `"null"` default equals no default.
    fn same_definition(&self, desired: &Column, current: &Column) -> Result<bool, GrammarError> {
        let mut desired = desired.clone();
        let mut current = current.clone();
        for parameter in ["charset", "collation"] {
            if desired.get_parameter(parameter).is_none()
                || current.get_parameter(parameter).is_none()
            {
                desired.remove_parameter(parameter);
                current.remove_parameter(parameter);
            }
        }
        for column in [&mut desired, &mut current] {
            let normalized = column.get_default().and_then(normalize_default);
            column.replace_default(normalized);
        }
        Ok(self.compile_column(&desired)? == self.compile_column(&current)?)
    }

    /// Column list of the table after the diff.
    fn next_columns(&self, table: &Table, current: Option<&Table>, plan: &ColumnPlan) -> Vec<Column> {
        let Some(current) = current else {
            return plan.create.iter().map(|c| (*c).clone()).collect();
        };

        let mut columns: Vec<Column> = current
            .columns()
            .iter()
            .filter(|c| !plan.delete.contains(&c.name()))
            .cloned()
            .collect();

        for (old_name, column) in &plan.update {
            if let Some(slot) = columns.iter_mut().find(|c| c.name() == old_name) {
                *slot = column.clone();
            }
        }
        for column in &plan.new {
            let position = previous_column(table, column.name(), true)
                .and_then(|previous| columns.iter().position(|c| c.name() == previous))
                .map_or(columns.len(), |at| at + 1);
            columns.insert(position, (*column).clone());
        }
        columns
    }

    fn create_table(&self, table: &Table, columns: &[&Column]) -> Result<Statement, GrammarError> {
        let compiled = columns
            .iter()
            .map(|c| self.compile_column(c))
            .collect::<Result<Vec<_>, _>>()?;
        let primary_keys: Vec<String> = columns
            .iter()
            .filter(|c| c.is_primary())
            .map(|c| backtick(c.name()))
            .collect();

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({}",
            backtick(table.name()),
            compiled.join(",")
        );
        if !primary_keys.is_empty() {
            sql.push_str(&format!(", PRIMARY KEY ({})", primary_keys.join(",")));
        }
        sql.push_str(&format!(
            ") ENGINE={} DEFAULT CHARSET={} COLLATE={}",
            table.parameter_str("engine", DEFAULT_ENGINE),
            table.parameter_str("charset", DEFAULT_CHARSET),
            table.parameter_str("collation", DEFAULT_COLLATION),
        ));
        Ok(Statement::standalone(sql))
    }

    fn add_column(&self, table: &Table, column: &Column) -> Result<Statement, GrammarError> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            backtick(table.name()),
            self.compile_column(column)?
        );
        // Renames run after additions, so a renamed column still has its old name here.
        if let Some(previous) = previous_column(table, column.name(), false) {
            sql.push_str(&format!(" AFTER {}", backtick(previous)));
        }
        Ok(Statement::transactional(sql))
    }

    fn change_column(
        &self,
        table: &Table,
        old_name: &str,
        column: &Column,
    ) -> Result<Statement, GrammarError> {
        Ok(Statement::transactional(format!(
            "ALTER TABLE {} CHANGE COLUMN {} {}",
            backtick(table.name()),
            backtick(old_name),
            self.compile_column(column)?
        )))
    }

    fn drop_column(&self, table: &Table, name: &str) -> Statement {
        Statement::transactional(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            backtick(table.name()),
            backtick(name)
        ))
    }

    /// Index statements plus the indexes of the table after the diff.
    fn indexes(
        &self,
        table: &Table,
        current: Option<&Table>,
        column_names: &HashSet<&str>,
    ) -> (Vec<Statement>, Vec<Index>) {
        let mut statements = Vec::new();
        let mut next = Vec::new();
        let table_name = backtick(table.name());

        for index in table.indexes() {
            if !index.get_columns().iter().all(|c| column_names.contains(c.as_str())) {
                log::debug!(
                    "Index `{}` of table `{}` references a missing column, dropping it",
                    index.name(),
                    table.name()
                );
                continue;
            }

            let existing = current.and_then(|c| c.get_index(index.name()));

            if let Some(to) = index.renamed_to() {
                if existing.is_none() && current.is_some_and(|c| c.get_index(to).is_some()) {
                    // Renamed on an earlier run.
                    next.push(index.settled_as(to));
                    continue;
                }
            }

            if index.is_drop() || index.renamed_to().is_some() {
                if existing.is_some() {
                    statements.push(Statement::transactional(format!(
                        "ALTER TABLE {table_name} DROP INDEX {}",
                        backtick(index.name())
                    )));
                }
                if index.is_drop() {
                    continue;
                }
            }

            let target = match (index.renamed_to(), existing) {
                (Some(to), Some(existing)) => existing.settled_as(to),
                (Some(to), None) => index.settled_as(to),
                (None, Some(_)) => {
                    next.push(index.clone());
                    continue;
                }
                (None, None) => index.clone(),
            };

            // A primary key only comes with a new table.
            let has_primary_key = current.is_some_and(|c| c.columns().iter().any(Column::is_primary));
            if !(target.is_primary() && has_primary_key) {
                statements.push(self.add_index(&table_name, &target));
            }
            next.push(target);
        }

        (statements, next)
    }

    fn add_index(&self, table_name: &str, index: &Index) -> Statement {
        let columns = index
            .get_columns()
            .iter()
            .map(|c| backtick(c))
            .collect::<Vec<_>>()
            .join(",");
        let sql = if index.is_primary() {
            format!("ALTER TABLE {table_name} ADD PRIMARY KEY ({columns})")
        } else if index.is_unique() {
            format!(
                "ALTER TABLE {table_name} ADD UNIQUE KEY {} ({columns})",
                backtick(index.name())
            )
        } else {
            format!(
                "ALTER TABLE {table_name} ADD KEY {} ({columns})",
                backtick(index.name())
            )
        };
        Statement::transactional(sql)
    }

    /// Multi-row inserts for the seed items, one per chunk.
    fn inserts(&self, table: &Table, current: Option<&Table>) -> Vec<Statement> {
        let Some(items) = table.get_items() else {
            return Vec::new();
        };
        if !items.forcing_insert() && current.is_some_and(|c| c.get_items_count() > 0) {
            return Vec::new();
        }

        let table_name = backtick(table.name());
        items
            .chunks()
            .map(|rows| {
                let columns: Vec<&String> = rows[0].keys().collect();
                let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
                let bindings = rows
                    .iter()
                    .flat_map(|row| {
                        columns
                            .iter()
                            .map(|c| row.get(c.as_str()).cloned().unwrap_or(Value::Null))
                    })
                    .collect();
                let sql = format!(
                    "INSERT INTO {table_name} ({}) VALUES {}",
                    columns.iter().map(|c| backtick(c)).collect::<Vec<_>>().join(","),
                    vec![placeholders; rows.len()].join(",")
                );
                Statement::new(sql, bindings, items.with_transaction())
            })
            .collect()
    }

    /// Column definition as used by `CREATE TABLE`, `ADD COLUMN` and
    /// `CHANGE COLUMN`.
    pub fn compile_column(&self, column: &Column) -> Result<String, GrammarError> {
        let column_type = match column.kind() {
            ColumnKind::Field(column_type) => *column_type,
            // Operations never reach compilation.
            _ => return Ok(backtick(column.name())),
        };
        let native = mysql_type(column_type).ok_or_else(|| GrammarError::UnsupportedColumnType {
            column: column.name().to_string(),
            column_type,
        })?;

        let mut clause = vec![backtick(column.name())];
        match column.get_length() {
            Some(length) => clause.push(format!("{native}({length})")),
            None => clause.push(native.to_string()),
        }
        if let Some(charset) = column.get_parameter("charset").and_then(parameter_text) {
            clause.push(format!("CHARACTER SET {charset}"));
        }
        if let Some(collation) = column.get_parameter("collation").and_then(parameter_text) {
            clause.push(format!("COLLATE {collation}"));
        }
        if column.get_unsigned() == Some(true) {
            clause.push("UNSIGNED".to_string());
        }
        if let Some(nullable) = column.get_nullable() {
            clause.push(if nullable { "NULL" } else { "NOT NULL" }.to_string());
        }
        if column_type == ColumnType::Bool {
            let on = column.get_default().is_some_and(is_truthy);
            clause.push(format!("DEFAULT {}", u8::from(on)));
        } else if let Some(default) = column.get_default().and_then(compile_default) {
            clause.push(format!("DEFAULT {default}"));
        }
        if column_type.is_primary() {
            clause.push("AUTO_INCREMENT".to_string());
        }
        if needs_type_hint(column_type) {
            clause.push(format!("COMMENT '{TYPE_HINT_PREFIX}{column_type}'"));
        }
        Ok(clause.join(" "))
    }
}

impl Grammar for MySqlGrammar {
    fn create_statements(
        &self,
        table: &Table,
        current: Option<&Table>,
    ) -> Result<Statements, GrammarError> {
        if table.is_dropping() {
            let mut next = Table::new(table.name());
            for (name, value) in table.parameters() {
                next.parameter(name.as_str(), value.clone());
            }
            next.drop_table();
            let drop = Statement::standalone(format!(
                "DROP TABLE IF EXISTS {}",
                backtick(table.name())
            ));
            return Ok(Statements::new(vec![drop], next));
        }

        let plan = self.plan_columns(table, current)?;
        let next_columns = self.next_columns(table, current, &plan);
        let column_names: HashSet<&str> = next_columns.iter().map(Column::name).collect();
        let mut statements = Vec::new();

        if !plan.create.is_empty() {
            statements.push(self.create_table(table, &plan.create)?);
        }
        for column in &plan.new {
            statements.push(self.add_column(table, column)?);
        }
        for (old_name, column) in &plan.update {
            statements.push(self.change_column(table, old_name, column)?);
        }
        for name in &plan.delete {
            statements.push(self.drop_column(table, name));
        }

        let (index_statements, next_indexes) = self.indexes(table, current, &column_names);
        statements.extend(index_statements);

        // Nothing to act on when the table neither exists nor was just created.
        let exists = current.is_some() || !plan.create.is_empty();

        if table.is_truncating() && exists {
            statements.push(Statement::transactional(format!(
                "TRUNCATE {}",
                backtick(table.name())
            )));
        }

        statements.extend(self.inserts(table, current));

        let mut next_name = table.name();
        if let Some(to) = table.renamed_to() {
            if exists {
                statements.push(Statement::transactional(format!(
                    "ALTER TABLE {} RENAME {}",
                    backtick(table.name()),
                    backtick(to)
                )));
                next_name = to;
            }
        }

        let mut next = Table::new(next_name);
        for (name, value) in table.parameters() {
            next.parameter(name.as_str(), value.clone());
        }
        for column in next_columns {
            next.add_column(column);
        }
        for index in next_indexes {
            next.add_index(index);
        }

        Ok(Statements::new(statements, next))
    }
}

fn backtick(value: &str) -> String {
    format!("`{value}`")
}

/// Nearest declared column before `name` that is not being dropped. A rename
/// counts under its new name when `renamed` is set, under its old one otherwise.
fn previous_column<'a>(table: &'a Table, name: &str, renamed: bool) -> Option<&'a str> {
    let columns = table.columns();
    let at = columns.iter().position(|c| c.name() == name)?;
    columns[..at].iter().rev().find_map(|c| match c.kind() {
        ColumnKind::Field(_) => Some(c.name()),
        ColumnKind::Rename { to } if renamed => Some(to.as_str()),
        ColumnKind::Rename { .. } => Some(c.name()),
        ColumnKind::Drop => None,
    })
}

fn parameter_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_numeric(value: &str) -> bool {
    NUMERIC.is_match(value)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(values) => !values.is_empty(),
        Value::Object(_) => true,
    }
}

/// Literal of a `DEFAULT` clause, `None` when no clause applies.
fn compile_default(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(u8::from(*b).to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.eq_ignore_ascii_case("null") => Some("NULL".to_string()),
        Value::String(s) if is_numeric(s) => Some(s.trim().to_string()),
        Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        _ => None,
    }
}

/// Default as compared between two definitions.
fn normalize_default(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if s.eq_ignore_ascii_case("null") => None,
        Value::String(s) if is_numeric(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .map(|f| Value::String(f.to_string())),
        Value::Number(n) => n.as_f64().map(|f| Value::String(f.to_string())),
        other => Some(other.clone()),
    }
}
