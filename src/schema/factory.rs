//! Build schema descriptors from JSON (or anything deserialized into a
//! [`serde_json::Value`], such as TOML table definitions).
//!
//! ```
//! use schemasync::schema::factory::TableFactory;
//! use serde_json::json;
//!
//! let table = TableFactory::create_table_from_value(&json!({
//!     "name": "products",
//!     "columns": [
//!         {"type": "primary", "name": "id"},
//!         {"type": "string", "name": "title", "length": 100, "nullable": false}
//!     ],
//!     "indexes": [{"name": "title_idx", "column": "title", "unique": true}]
//! }))
//! .unwrap();
//! assert_eq!(table.columns().len(), 2);
//! ```

use serde_json::Value;
use std::path::Path;

use super::column::Column;
use super::column_type::{ColumnType, DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE};
use super::error::{CreateColumnError, CreateIndexError, CreateTableError, ItemsError};
use super::index::Index;
use super::items::{Items, JsonFileItems};
use super::table::Table;

pub struct ColumnFactory;

impl ColumnFactory {
    /// Column of the named schema type, e.g. `bigInt`.
    pub fn create_column(column_type: &str, name: &str) -> Result<Column, CreateColumnError> {
        Ok(Column::new(name, column_type.parse::<ColumnType>()?))
    }

    /// Column from a definition object.
    ///
    /// Recognized keys: `type`, `name`, `length`, `nullable`, `default`,
    /// `unsigned`, `parameters`, `precision`, `scale`. A `rename` key (new
    /// name) or `drop: true` turns the entry into the matching operation and
    /// makes `type` optional. Keys with the wrong value type are ignored.
    pub fn create_column_from_value(definition: &Value) -> Result<Column, CreateColumnError> {
        let invalid = |field| CreateColumnError::InvalidDefinition {
            field,
            definition: definition.clone(),
        };

        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("name"))?;

        if let Some(to) = definition.get("rename").and_then(Value::as_str) {
            return Ok(Column::rename(name, to));
        }
        if definition.get("drop").and_then(Value::as_bool) == Some(true) {
            return Ok(Column::drop(name));
        }

        let column_type = definition
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("type"))?;
        let mut column = Self::create_column(column_type, name)?;

        if let Some(length) = definition
            .get("length")
            .and_then(Value::as_u64)
            .and_then(|l| u32::try_from(l).ok())
        {
            column.length(length);
        }
        if let Some(nullable) = definition.get("nullable").and_then(Value::as_bool) {
            column.nullable(nullable);
        }
        if let Some(default) = definition.get("default") {
            // Structured defaults are stored as their JSON text.
            match default {
                Value::Array(_) | Value::Object(_) => column.default(default.to_string()),
                _ => column.default(default.clone()),
            };
        }
        if let Some(unsigned) = definition.get("unsigned").and_then(Value::as_bool) {
            column.unsigned(unsigned);
        }
        if let Some(parameters) = definition.get("parameters").and_then(Value::as_object) {
            for (name, value) in parameters {
                column.parameter(name.as_str(), value.clone());
            }
        }
        if column.column_type() == Some(ColumnType::Decimal) {
            let read = |key| {
                definition
                    .get(key)
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
            };
            column.precision(
                read("precision").unwrap_or(DEFAULT_DECIMAL_PRECISION),
                read("scale").unwrap_or(DEFAULT_DECIMAL_SCALE),
            );
        }

        Ok(column)
    }
}

pub struct IndexFactory;

impl IndexFactory {
    /// Index from a definition object with keys `name`, `column` (string or
    /// list), `unique`, `primary`, `rename` and `drop`.
    pub fn create_index_from_value(definition: &Value) -> Result<Index, CreateIndexError> {
        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CreateIndexError::InvalidDefinition {
                field: "name",
                definition: definition.clone(),
            })?;

        let mut index = Index::new(name);
        match definition.get("column") {
            Some(Value::String(column)) => {
                index.column(column.as_str());
            }
            Some(Value::Array(columns)) => {
                index.columns(columns.iter().filter_map(Value::as_str));
            }
            _ => {}
        }
        if definition.get("unique").and_then(Value::as_bool) == Some(true) {
            index.unique();
        }
        if definition.get("primary").and_then(Value::as_bool) == Some(true) {
            index.primary();
        }
        if let Some(to) = definition.get("rename").and_then(Value::as_str) {
            index.rename(to);
        }
        if definition.get("drop").and_then(Value::as_bool) == Some(true) {
            index.drop();
        }
        Ok(index)
    }
}

pub struct TableFactory;

impl TableFactory {
    pub fn create_table(name: &str) -> Table {
        Table::new(name)
    }

    /// Table from a definition object.
    ///
    /// Besides `name`, `columns` and `indexes`, a definition may carry
    /// `truncate`, `drop`, `rename`, `parameters` and `items`. Items are either
    /// an inline array of rows or an object with `rows` or `file` plus the
    /// `chunk`, `useTransaction` and `forceInsert` policy keys. Relative item
    /// files resolve against `base_dir` when one is given.
    pub fn create_table_from_value(definition: &Value) -> Result<Table, CreateTableError> {
        Self::create_table_from_value_in(definition, None)
    }

    pub fn create_table_from_value_in(
        definition: &Value,
        base_dir: Option<&Path>,
    ) -> Result<Table, CreateTableError> {
        let invalid = |field| CreateTableError::InvalidDefinition {
            field,
            definition: definition.clone(),
        };

        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("name"))?;
        let mut table = Self::create_table(name);

        for column in Self::list(definition, "columns").map_err(invalid)? {
            let column = ColumnFactory::create_column_from_value(column).map_err(|source| {
                CreateTableError::Column {
                    table: name.to_string(),
                    source,
                }
            })?;
            table.add_column(column);
        }
        for index in Self::list(definition, "indexes").map_err(invalid)? {
            let index = IndexFactory::create_index_from_value(index).map_err(|source| {
                CreateTableError::Index {
                    table: name.to_string(),
                    source,
                }
            })?;
            table.add_index(index);
        }

        if definition.get("truncate").and_then(Value::as_bool) == Some(true) {
            table.truncate();
        }
        if definition.get("drop").and_then(Value::as_bool) == Some(true) {
            table.drop_table();
        }
        if let Some(to) = definition.get("rename").and_then(Value::as_str) {
            table.rename_table(to);
        }
        if let Some(parameters) = definition.get("parameters").and_then(Value::as_object) {
            for (key, value) in parameters {
                table.parameter(key.as_str(), value.clone());
            }
        }
        if let Some(items) = definition.get("items") {
            // `None` means the definition is malformed; an inner error means
            // the item file could not be loaded.
            let items = Self::items(items, base_dir).ok_or_else(|| invalid("items"))??;
            table.items(items);
        }

        Ok(table)
    }

    fn list<'a>(definition: &'a Value, key: &'static str) -> Result<&'a [Value], &'static str> {
        match definition.get(key) {
            None => Ok(&[]),
            Some(Value::Array(values)) => Ok(values),
            Some(_) => Err(key),
        }
    }

    fn items(definition: &Value, base_dir: Option<&Path>) -> Option<Result<Items, ItemsError>> {
        let rows = |values: &Vec<Value>| -> Option<Vec<crate::Row>> {
            values.iter().map(|v| v.as_object().cloned()).collect()
        };

        let policy = match definition {
            Value::Array(values) => return rows(values).map(|r| Ok(Items::from(r))),
            Value::Object(policy) => policy,
            _ => return None,
        };

        let mut items = if let Some(Value::Array(values)) = policy.get("rows") {
            Items::from(rows(values)?)
        } else {
            let file = policy.get("file").and_then(Value::as_str)?;
            let path = match base_dir {
                Some(dir) => dir.join(file),
                None => file.into(),
            };
            match JsonFileItems::open(path) {
                Ok(source) => Items::new(source),
                Err(e) => return Some(Err(e)),
            }
        };

        if let Some(chunk) = policy.get("chunk").and_then(Value::as_u64) {
            items = items.chunk(chunk as usize);
        }
        if let Some(use_transaction) = policy.get("useTransaction").and_then(Value::as_bool) {
            items = items.use_transaction(use_transaction);
        }
        if let Some(force) = policy.get("forceInsert").and_then(Value::as_bool) {
            items = items.force_insert(force);
        }
        Some(Ok(items))
    }
}
