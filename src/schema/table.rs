//! Table descriptors.

use serde_json::{Map, Value};

use super::column::Column;
use super::column_type::ColumnType;
use super::index::Index;
use super::items::Items;

/// A table as declared by the caller, or as found in the database.
///
/// Columns and indexes are keyed by name and keep insertion order. Adding one
/// whose name is already present replaces the earlier entry in place.
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    indexes: Vec<Index>,
    items: Option<Items>,
    items_count: u64,
    truncate: bool,
    rename: Option<String>,
    drop: bool,
    parameters: Map<String, Value>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_column(&mut self, column: Column) -> &mut Self {
        self.added_column(column);
        self
    }

    fn added_column(&mut self, column: Column) -> &mut Column {
        let position = match self.columns.iter().position(|c| c.name() == column.name()) {
            Some(position) => {
                self.columns[position] = column;
                position
            }
            None => {
                self.columns.push(column);
                self.columns.len() - 1
            }
        };
        &mut self.columns[position]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    pub fn add_index(&mut self, index: Index) -> &mut Self {
        self.added_index(index);
        self
    }

    fn added_index(&mut self, index: Index) -> &mut Index {
        let position = match self.indexes.iter().position(|i| i.name() == index.name()) {
            Some(position) => {
                self.indexes[position] = index;
                position
            }
            None => {
                self.indexes.push(index);
                self.indexes.len() - 1
            }
        };
        &mut self.indexes[position]
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name() == name)
    }

    /// Declares an index; use an empty name together with
    /// [`Index::primary`] for the primary key.
    pub fn index(&mut self, name: impl Into<String>) -> &mut Index {
        self.added_index(Index::new(name))
    }

    pub fn primary(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Primary))
    }

    pub fn big_primary(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::BigPrimary))
    }

    pub fn bool(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Bool))
    }

    pub fn int(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Int))
    }

    pub fn tiny_int(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::TinyInt))
    }

    pub fn big_int(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::BigInt))
    }

    pub fn char(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Char))
    }

    pub fn string(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::String))
    }

    pub fn text(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Text))
    }

    pub fn double(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Double))
    }

    pub fn float(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Float))
    }

    pub fn decimal(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Decimal))
    }

    pub fn datetime(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Datetime))
    }

    pub fn date(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Date))
    }

    pub fn time(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Time))
    }

    pub fn timestamp(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Timestamp))
    }

    pub fn json(&mut self, name: impl Into<String>) -> &mut Column {
        self.added_column(Column::new(name, ColumnType::Json))
    }

    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.add_column(Column::rename(from, to))
    }

    pub fn drop_column(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_column(Column::drop(name))
    }

    /// Empty the table on the next run.
    pub fn truncate(&mut self) -> &mut Self {
        self.truncate = true;
        self
    }

    pub fn is_truncating(&self) -> bool {
        self.truncate
    }

    pub fn rename_table(&mut self, to: impl Into<String>) -> &mut Self {
        self.rename = Some(to.into());
        self
    }

    pub fn renamed_to(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    pub fn drop_table(&mut self) -> &mut Self {
        self.drop = true;
        self
    }

    pub fn is_dropping(&self) -> bool {
        self.drop
    }

    pub fn items(&mut self, items: impl Into<Items>) -> &mut Self {
        self.items = Some(items.into());
        self
    }

    pub fn get_items(&self) -> Option<&Items> {
        self.items.as_ref()
    }

    /// Rows found in the live table when it was last fetched.
    pub fn items_count(&mut self, count: u64) -> &mut Self {
        self.items_count = count;
        self
    }

    pub fn get_items_count(&self) -> u64 {
        self.items_count
    }

    pub fn parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// String parameter or `fallback`.
    pub fn parameter_str<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.parameters
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }
}
