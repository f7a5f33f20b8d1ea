//! MySQL type names.
//!
//! `FORWARD` compiles a declared [`ColumnType`] into its MySQL type. `REVERSE`
//! resolves a native type reported by `SHOW FULL COLUMNS` by prefix; longer
//! names come before their prefixes (`tinyint` before `int`, `datetime` before
//! `date`) so the first match wins.

use crate::schema::ColumnType;

pub const FORWARD: [(ColumnType, &str); 17] = [
    (ColumnType::Primary, "int"),
    (ColumnType::BigPrimary, "bigint"),
    (ColumnType::Bool, "tinyint"),
    (ColumnType::Int, "int"),
    (ColumnType::TinyInt, "tinyint"),
    (ColumnType::BigInt, "bigint"),
    (ColumnType::Char, "char"),
    (ColumnType::String, "varchar"),
    (ColumnType::Text, "text"),
    (ColumnType::Double, "double"),
    (ColumnType::Float, "float"),
    (ColumnType::Decimal, "decimal"),
    (ColumnType::Datetime, "datetime"),
    (ColumnType::Date, "date"),
    (ColumnType::Time, "time"),
    (ColumnType::Timestamp, "timestamp"),
    (ColumnType::Json, "longtext"),
];

pub const REVERSE: [(&str, ColumnType); 13] = [
    ("tinyint", ColumnType::TinyInt),
    ("bigint", ColumnType::BigInt),
    ("int", ColumnType::Int),
    ("char", ColumnType::Char),
    ("varchar", ColumnType::String),
    ("text", ColumnType::Text),
    ("double", ColumnType::Double),
    ("float", ColumnType::Float),
    ("decimal", ColumnType::Decimal),
    ("datetime", ColumnType::Datetime),
    ("date", ColumnType::Date),
    ("timestamp", ColumnType::Timestamp),
    ("time", ColumnType::Time),
];

/// Comment prefix marking the declared type of a column.
pub const TYPE_HINT_PREFIX: &str = "type:";

/// Declared types MySQL cannot represent natively; they carry a type hint.
pub const HINTED_TYPES: [ColumnType; 2] = [ColumnType::Bool, ColumnType::Json];

pub fn mysql_type(column_type: ColumnType) -> Option<&'static str> {
    FORWARD
        .iter()
        .find(|(t, _)| *t == column_type)
        .map(|(_, name)| *name)
}

/// Resolves a native type such as `int(11) unsigned`.
pub fn column_type_for(native: &str) -> Option<ColumnType> {
    let native = native.trim().to_lowercase();
    REVERSE
        .iter()
        .find(|(prefix, _)| native.starts_with(prefix))
        .map(|(_, column_type)| *column_type)
}

/// Declared type recorded in a column comment such as `type:bool`.
pub fn hinted_type(comment: &str) -> Option<ColumnType> {
    let hinted = comment.trim().strip_prefix(TYPE_HINT_PREFIX)?;
    HINTED_TYPES
        .into_iter()
        .find(|column_type| column_type.as_str() == hinted)
}

pub fn needs_type_hint(column_type: ColumnType) -> bool {
    HINTED_TYPES.contains(&column_type)
}
