//! Column descriptors.
//!
//! A [`Column`] is one struct for every declared type. Which setters take
//! effect is decided by the [`ColumnType`] capabilities; setting a capability
//! the type lacks is silently ignored, as with a `text` column's default.

use serde_json::{Map, Value};

use super::column_type::{ColumnType, Length};

/// What a column entry in a table stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// A real column with a storage type.
    Field(ColumnType),
    /// Rename the existing column `name` to `to`.
    Rename { to: String },
    /// Drop the existing column `name`.
    Drop,
}

/// A column of a table, or a rename/drop operation on one.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    length: Option<Length>,
    nullable: bool,
    default: Option<Value>,
    unsigned: bool,
    parameters: Map<String, Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Field(column_type),
            length: column_type.default_length(),
            nullable: true,
            default: None,
            unsigned: true,
            parameters: Map::new(),
        }
    }

    /// A pseudo column renaming `from` to `to`.
    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::operation(from.into(), ColumnKind::Rename { to: to.into() })
    }

    /// A pseudo column dropping `name`.
    pub fn drop(name: impl Into<String>) -> Self {
        Self::operation(name.into(), ColumnKind::Drop)
    }

    fn operation(name: String, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            length: None,
            nullable: true,
            default: None,
            unsigned: true,
            parameters: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// The storage type, `None` for rename/drop entries.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self.kind {
            ColumnKind::Field(column_type) => Some(column_type),
            _ => None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.column_type().is_some_and(|t| t.is_primary())
    }

    /// Name a rename entry moves the column to.
    pub fn renamed_to(&self) -> Option<&str> {
        match &self.kind {
            ColumnKind::Rename { to } => Some(to),
            _ => None,
        }
    }

    pub fn is_drop(&self) -> bool {
        self.kind == ColumnKind::Drop
    }

    /// Copy of this column under another name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn length(&mut self, length: u32) -> &mut Self {
        if self.column_type().is_some_and(|t| t.has_settable_length()) {
            self.length = Some(Length::Size(length));
        }
        self
    }

    /// Sets `decimal(precision,scale)`.
    pub fn precision(&mut self, precision: u32, scale: u32) -> &mut Self {
        if self.column_type() == Some(ColumnType::Decimal) {
            self.length = Some(Length::Precision(precision, scale));
        }
        self
    }

    pub fn nullable(&mut self, nullable: bool) -> &mut Self {
        self.nullable = nullable;
        self
    }

    pub fn default(&mut self, default: impl Into<Value>) -> &mut Self {
        if self.column_type().is_some_and(|t| t.is_defaultable()) {
            self.default = Some(default.into());
        }
        self
    }

    pub fn unsigned(&mut self, unsigned: bool) -> &mut Self {
        self.unsigned = unsigned;
        self
    }

    pub fn parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.parameter("charset", charset.into())
    }

    pub fn collation(&mut self, collation: impl Into<String>) -> &mut Self {
        self.parameter("collation", collation.into())
    }

    /// Sets the default as read back from a database, bypassing capabilities.
    pub(crate) fn replace_default(&mut self, default: Option<Value>) {
        self.default = default;
    }

    pub(crate) fn remove_parameter(&mut self, name: &str) -> Option<Value> {
        self.parameters.shift_remove(name)
    }

    /// Length, for types that have one.
    pub fn get_length(&self) -> Option<&Length> {
        self.length.as_ref()
    }

    /// Nullability, for types that support it.
    pub fn get_nullable(&self) -> Option<bool> {
        self.column_type()
            .filter(|t| t.is_nullable())
            .map(|_| self.nullable)
    }

    /// The declared default. `None` when unset or the type takes no default.
    pub fn get_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Unsigned flag, for integer types.
    pub fn get_unsigned(&self) -> Option<bool> {
        self.column_type()
            .filter(|t| t.is_unsignable())
            .map(|_| self.unsigned)
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_column_uses_type_defaults() {
        let column = Column::new("id", ColumnType::Int);
        assert_eq!(column.name(), "id");
        assert_eq!(column.get_length(), Some(&Length::Size(11)));
        assert_eq!(column.get_nullable(), Some(true));
        assert_eq!(column.get_unsigned(), Some(true));
        assert_eq!(column.get_default(), None);
    }

    #[test]
    fn test_unsupported_capabilities_are_ignored() {
        let mut text = Column::new("body", ColumnType::Text);
        text.length(20).default("x").unsigned(false);
        assert_eq!(text.get_length(), None);
        assert_eq!(text.get_default(), None);
        assert_eq!(text.get_unsigned(), None);

        let mut primary = Column::new("id", ColumnType::Primary);
        primary.nullable(true);
        assert_eq!(primary.get_nullable(), None);
    }

    #[test]
    fn test_bool_length_is_fixed() {
        let mut column = Column::new("active", ColumnType::Bool);
        column.length(5);
        assert_eq!(column.get_length(), Some(&Length::Size(1)));
    }

    #[test]
    fn test_decimal_precision() {
        let mut column = Column::new("price", ColumnType::Decimal);
        column.length(5);
        assert_eq!(column.get_length(), Some(&Length::Precision(10, 0)));
        column.precision(8, 2);
        assert_eq!(column.get_length(), Some(&Length::Precision(8, 2)));
    }

    #[test]
    fn test_pseudo_columns() {
        let rename = Column::rename("id", "new_id");
        assert_eq!(rename.name(), "id");
        assert_eq!(rename.renamed_to(), Some("new_id"));
        assert_eq!(rename.column_type(), None);

        let drop = Column::drop("id");
        assert!(drop.is_drop());
        assert_eq!(drop.get_nullable(), None);
    }

    #[test]
    fn test_parameters() {
        let mut column = Column::new("name", ColumnType::String);
        column.charset("utf8mb4").collation("utf8mb4_bin").parameter("x", 1);
        assert_eq!(column.get_parameter("charset"), Some(&json!("utf8mb4")));
        assert_eq!(column.get_parameter("collation"), Some(&json!("utf8mb4_bin")));
        assert_eq!(column.remove_parameter("x"), Some(json!(1)));
        assert_eq!(column.parameters().len(), 2);
    }
}
