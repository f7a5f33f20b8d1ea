//! Reads MySQL tables back into [`Table`] descriptors.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::error::{StorageFetchError, StorageStoreError};
use super::type_mapping::{column_type_for, hinted_type};
use super::Storage;
use crate::database::Database;
use crate::schema::{Column, ColumnType, Index, Table};
use crate::Row;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

static LENGTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid length pattern"));
static PRECISION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+),\s*(\d+)\)").expect("valid precision pattern"));

/// Introspects tables with `SHOW FULL COLUMNS` and `SHOW INDEXES`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlStorage;

impl MySqlStorage {
    pub fn new() -> Self {
        Self
    }

    fn run(
        &self,
        database: &mut Database,
        table: &str,
        sql: &str,
    ) -> Result<Vec<Row>, StorageFetchError> {
        database
            .query(sql, &[])
            .map_err(|source| StorageFetchError::Query {
                table: table.to_string(),
                source,
            })
    }

    fn create_column(&self, table: &str, row: &Row) -> Result<Column, StorageFetchError> {
        let name = text(row, "Field").unwrap_or_default();
        let native = text(row, "Type").unwrap_or_default();
        let column_type = resolve_type(row, &native).ok_or_else(|| {
            StorageFetchError::UnresolvableType {
                table: table.to_string(),
                column: name.clone(),
                native: native.clone(),
            }
        })?;

        let mut column = Column::new(name, column_type);
        if column_type == ColumnType::Decimal {
            if let Some((precision, scale)) = precision(&native) {
                column.precision(precision, scale);
            }
        } else if let Some(length) = length(&native) {
            column.length(length);
        }
        column
            .unsigned(native.contains("unsigned"))
            .nullable(text(row, "Null").as_deref() == Some("YES"));
        if let Some(default) = row.get("Default").filter(|d| !d.is_null()) {
            column.default(default.clone());
        }
        if let Some(collation) = text(row, "Collation") {
            column.collation(collation);
        }
        Ok(column)
    }

    fn create_indexes(&self, rows: &[Row]) -> Vec<Index> {
        let mut indexes: Vec<Index> = Vec::new();
        for row in rows {
            let Some(name) = text(row, "Key_name") else {
                continue;
            };
            if name == "PRIMARY" {
                continue;
            }
            let position = match indexes.iter().position(|i| i.name() == name) {
                Some(position) => position,
                None => {
                    indexes.push(Index::new(name));
                    indexes.len() - 1
                }
            };
            let index = &mut indexes[position];
            if let Some(column) = text(row, "Column_name") {
                index.column(column);
            }
            if number(row, "Non_unique") == Some(0) {
                index.unique();
            }
        }
        indexes
    }
}

impl Storage for MySqlStorage {
    fn supports(&self, database: &Database) -> bool {
        database.driver_name() == "mysql"
    }

    fn fetch_table(
        &self,
        database: &mut Database,
        name: &str,
    ) -> Result<Option<Table>, StorageFetchError> {
        if !self.supports(database) {
            return Err(StorageFetchError::Unsupported {
                database: database.name().to_string(),
                driver: database.driver_name().to_string(),
            });
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::fetch_table_span(name).entered();

        let columns = match database.query(&format!("SHOW FULL COLUMNS FROM `{name}`"), &[]) {
            Ok(rows) => rows,
            Err(err) if err.is_table_missing() => {
                log::debug!("Table `{name}` does not exist");
                return Ok(None);
            }
            Err(source) => {
                return Err(StorageFetchError::Query {
                    table: name.to_string(),
                    source,
                })
            }
        };
        // MySQL tables always have a column.
        if columns.is_empty() {
            return Ok(None);
        }

        let mut table = Table::new(name);
        for row in &columns {
            table.add_column(self.create_column(name, row)?);
        }

        let index_rows = self.run(database, name, &format!("SHOW INDEXES FROM `{name}`"))?;
        for index in self.create_indexes(&index_rows) {
            table.add_index(index);
        }

        let count = self.run(
            database,
            name,
            &format!("SELECT COUNT(*) AS number FROM `{name}`"),
        )?;
        table.items_count(count.first().and_then(|row| number(row, "number")).unwrap_or(0));

        log::debug!(
            "Fetched table `{}` with {} columns and {} indexes",
            name,
            table.columns().len(),
            table.indexes().len()
        );
        Ok(Some(table))
    }

    fn store_table(&self, database: &mut Database, _table: &Table) -> Result<(), StorageStoreError> {
        // The live schema is the record.
        if !self.supports(database) {
            return Err(StorageStoreError::Unsupported {
                database: database.name().to_string(),
                driver: database.driver_name().to_string(),
            });
        }
        Ok(())
    }
}

fn resolve_type(row: &Row, native: &str) -> Option<ColumnType> {
    if native.is_empty() {
        return None;
    }
    if text(row, "Key").as_deref() == Some("PRI") {
        return Some(if native.starts_with("bigint") {
            ColumnType::BigPrimary
        } else {
            ColumnType::Primary
        });
    }
    if let Some(hinted) = text(row, "Comment").as_deref().and_then(hinted_type) {
        return Some(hinted);
    }
    if native.contains("timestamp") {
        return Some(ColumnType::Timestamp);
    }
    column_type_for(native)
}

fn length(native: &str) -> Option<u32> {
    LENGTH.find(native).and_then(|m| m.as_str().parse().ok())
}

fn precision(native: &str) -> Option<(u32, u32)> {
    let captures = PRECISION.captures(native)?;
    Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
}

/// String field of a result row; numbers are rendered.
fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(row: &Row, key: &str) -> Option<u64> {
    match row.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ER_NO_SUCH_TABLE;
    use crate::mock::MockExecutor;
    use crate::schema::Length;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn column_row(field: &str, native: &str, key: &str, default: Value, comment: &str) -> Row {
        row(json!({
            "Field": field,
            "Type": native,
            "Collation": null,
            "Null": "YES",
            "Key": key,
            "Default": default,
            "Extra": "",
            "Comment": comment,
        }))
    }

    fn database(mock: &MockExecutor) -> Database {
        Database::new("test", mock.clone())
    }

    fn script_products(mock: &MockExecutor) {
        mock.on_query(
            "SHOW FULL COLUMNS FROM `products`",
            vec![
                column_row("id", "int(11) unsigned", "PRI", Value::Null, ""),
                row(json!({
                    "Field": "name",
                    "Type": "varchar(30)",
                    "Collation": "utf8mb4_unicode_ci",
                    "Null": "NO",
                    "Key": "MUL",
                    "Default": "none",
                    "Comment": "",
                })),
                column_row("active", "tinyint(1)", "", json!("1"), "type:bool"),
                column_row("price", "decimal(8,2)", "", json!("0.00"), ""),
                column_row("data", "longtext", "", Value::Null, "type:json"),
                column_row("created", "timestamp", "", Value::Null, ""),
                column_row("qty", "int(10)", "", Value::Null, ""),
            ],
        )
        .on_query(
            "SHOW INDEXES FROM `products`",
            vec![
                row(json!({"Key_name": "PRIMARY", "Column_name": "id", "Non_unique": 0})),
                row(json!({"Key_name": "name_idx", "Column_name": "name", "Non_unique": 0})),
                row(json!({"Key_name": "multi", "Column_name": "name", "Non_unique": "1"})),
                row(json!({"Key_name": "multi", "Column_name": "qty", "Non_unique": "1"})),
            ],
        )
        .on_query("SELECT COUNT(*)", vec![row(json!({"number": 3}))]);
    }

    #[test]
    fn test_fetch_table() {
        let mock = MockExecutor::new("mysql");
        script_products(&mock);
        let mut db = database(&mock);

        let table = MySqlStorage::new()
            .fetch_table(&mut db, "products")
            .unwrap()
            .unwrap();

        let types: Vec<Option<ColumnType>> =
            table.columns().iter().map(Column::column_type).collect();
        assert_eq!(
            types,
            [
                Some(ColumnType::Primary),
                Some(ColumnType::String),
                Some(ColumnType::Bool),
                Some(ColumnType::Decimal),
                Some(ColumnType::Json),
                Some(ColumnType::Timestamp),
                Some(ColumnType::Int),
            ]
        );

        let name = table.get_column("name").unwrap();
        assert_eq!(name.get_length(), Some(&Length::Size(30)));
        assert_eq!(name.get_nullable(), Some(false));
        assert_eq!(name.get_default(), Some(&json!("none")));
        assert_eq!(name.get_parameter("collation"), Some(&json!("utf8mb4_unicode_ci")));

        let qty = table.get_column("qty").unwrap();
        assert_eq!(qty.get_length(), Some(&Length::Size(10)));
        assert_eq!(qty.get_unsigned(), Some(false));
        assert_eq!(qty.get_nullable(), Some(true));
        assert_eq!(table.get_column("id").unwrap().get_unsigned(), Some(true));

        assert_eq!(
            table.get_column("price").unwrap().get_length(),
            Some(&Length::Precision(8, 2))
        );

        assert_eq!(table.indexes().len(), 2);
        let name_idx = table.get_index("name_idx").unwrap();
        assert!(name_idx.is_unique());
        let multi = table.get_index("multi").unwrap();
        assert_eq!(multi.get_columns(), ["name", "qty"]);
        assert!(!multi.is_unique());

        assert_eq!(table.get_items_count(), 3);
    }

    #[test]
    fn test_big_primary() {
        let mock = MockExecutor::new("mysql");
        mock.on_query(
            "SHOW FULL COLUMNS",
            vec![column_row("id", "bigint(20) unsigned", "PRI", Value::Null, "")],
        );
        let mut db = database(&mock);

        let table = MySqlStorage::new().fetch_table(&mut db, "t").unwrap().unwrap();
        assert_eq!(
            table.get_column("id").and_then(Column::column_type),
            Some(ColumnType::BigPrimary)
        );
        assert_eq!(table.get_items_count(), 0);
    }

    #[test]
    fn test_missing_table_is_none() {
        let mock = MockExecutor::new("mysql");
        mock.on_query_error(
            "SHOW FULL COLUMNS",
            Some(ER_NO_SUCH_TABLE),
            "Table 'app.products' doesn't exist",
        );
        let mut db = database(&mock);

        assert!(MySqlStorage::new().fetch_table(&mut db, "products").unwrap().is_none());
        assert_eq!(mock.queries().len(), 1);
    }

    #[test]
    fn test_other_failures_propagate() {
        let mock = MockExecutor::new("mysql");
        mock.on_query_error("SHOW FULL COLUMNS", Some(2006), "MySQL server has gone away");
        let mut db = database(&mock);

        let err = MySqlStorage::new().fetch_table(&mut db, "products").unwrap_err();
        assert!(matches!(err, StorageFetchError::Query { .. }));
    }

    #[test]
    fn test_unresolvable_type() {
        let mock = MockExecutor::new("mysql");
        mock.on_query(
            "SHOW FULL COLUMNS",
            vec![column_row("shape", "geometry", "", Value::Null, "")],
        );
        let mut db = database(&mock);

        let err = MySqlStorage::new().fetch_table(&mut db, "t").unwrap_err();
        assert!(matches!(
            err,
            StorageFetchError::UnresolvableType { ref native, .. } if native == "geometry"
        ));
    }

    #[test]
    fn test_unsupported_driver() {
        let mock = MockExecutor::new("sqlite");
        let mut db = database(&mock);
        let storage = MySqlStorage::new();

        assert!(!storage.supports(&db));
        assert!(matches!(
            storage.fetch_table(&mut db, "t"),
            Err(StorageFetchError::Unsupported { .. })
        ));
        assert!(matches!(
            storage.store_table(&mut db, &Table::new("t")),
            Err(StorageStoreError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_fetched_table_diffs_clean_against_its_declaration() {
        use crate::processor::{Grammar, MySqlGrammar};

        let mock = MockExecutor::new("mysql");
        script_products(&mock);
        let mut db = database(&mock);
        let current = MySqlStorage::new().fetch_table(&mut db, "products").unwrap();

        let mut table = Table::new("products");
        table.primary("id");
        table.string("name").length(30).nullable(false).default("none");
        table.bool("active").default(true);
        table.decimal("price").precision(8, 2).default(0);
        table.json("data");
        table.timestamp("created");
        table.int("qty").length(10).unsigned(false);
        table.index("name_idx").column("name").unique();
        table.index("multi").columns(["name", "qty"]);

        let statements = MySqlGrammar::new()
            .create_statements(&table, current.as_ref())
            .unwrap();
        assert!(statements.is_empty(), "{statements:?}");
    }
}
