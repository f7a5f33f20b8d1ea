//! The closed set of column types a table can declare.
//!
//! Each type carries a fixed set of capabilities (length, nullability, default,
//! unsigned). Columns consult these instead of being separate structs per type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::CreateColumnError;

/// Display length of `primary` columns.
pub const DEFAULT_PRIMARY_LENGTH: u32 = 11;
/// Display length of `bigPrimary` columns.
pub const DEFAULT_BIG_PRIMARY_LENGTH: u32 = 20;
/// Fixed length of `bool` columns.
pub const BOOL_LENGTH: u32 = 1;
pub const DEFAULT_INT_LENGTH: u32 = 11;
pub const DEFAULT_TINY_INT_LENGTH: u32 = 1;
pub const DEFAULT_BIG_INT_LENGTH: u32 = 20;
pub const DEFAULT_CHAR_LENGTH: u32 = 255;
pub const DEFAULT_STRING_LENGTH: u32 = 255;
/// Default `precision,scale` pair of `decimal` columns.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 10;
pub const DEFAULT_DECIMAL_SCALE: u32 = 0;

/// Column type as declared in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    Primary,
    BigPrimary,
    Bool,
    Int,
    TinyInt,
    BigInt,
    Char,
    String,
    Text,
    Double,
    Float,
    Decimal,
    Datetime,
    Date,
    Time,
    Timestamp,
    Json,
}

impl ColumnType {
    /// Every declarable type, in declaration order.
    pub const ALL: [ColumnType; 17] = [
        ColumnType::Primary,
        ColumnType::BigPrimary,
        ColumnType::Bool,
        ColumnType::Int,
        ColumnType::TinyInt,
        ColumnType::BigInt,
        ColumnType::Char,
        ColumnType::String,
        ColumnType::Text,
        ColumnType::Double,
        ColumnType::Float,
        ColumnType::Decimal,
        ColumnType::Datetime,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::Timestamp,
        ColumnType::Json,
    ];

    /// Schema name of the type, e.g. `bigPrimary`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Primary => "primary",
            ColumnType::BigPrimary => "bigPrimary",
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::TinyInt => "tinyInt",
            ColumnType::BigInt => "bigInt",
            ColumnType::Char => "char",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Double => "double",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::Datetime => "datetime",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        }
    }

    /// Auto-incrementing key types. These are never altered once created.
    pub fn is_primary(&self) -> bool {
        matches!(self, ColumnType::Primary | ColumnType::BigPrimary)
    }

    /// Length a freshly declared column starts with, if the type has one.
    pub fn default_length(&self) -> Option<Length> {
        let length = match self {
            ColumnType::Primary => DEFAULT_PRIMARY_LENGTH,
            ColumnType::BigPrimary => DEFAULT_BIG_PRIMARY_LENGTH,
            ColumnType::Bool => BOOL_LENGTH,
            ColumnType::Int => DEFAULT_INT_LENGTH,
            ColumnType::TinyInt => DEFAULT_TINY_INT_LENGTH,
            ColumnType::BigInt => DEFAULT_BIG_INT_LENGTH,
            ColumnType::Char => DEFAULT_CHAR_LENGTH,
            ColumnType::String => DEFAULT_STRING_LENGTH,
            ColumnType::Decimal => {
                return Some(Length::Precision(
                    DEFAULT_DECIMAL_PRECISION,
                    DEFAULT_DECIMAL_SCALE,
                ))
            }
            _ => return None,
        };
        Some(Length::Size(length))
    }

    pub fn has_length(&self) -> bool {
        self.default_length().is_some()
    }

    /// Whether [`Column::length`](super::Column::length) may change the length.
    ///
    /// `bool` is pinned to one digit; `decimal` is changed through
    /// [`Column::precision`](super::Column::precision) instead.
    pub fn has_settable_length(&self) -> bool {
        self.has_length() && !matches!(self, ColumnType::Bool | ColumnType::Decimal)
    }

    pub fn is_nullable(&self) -> bool {
        !matches!(
            self,
            ColumnType::Primary | ColumnType::BigPrimary | ColumnType::Bool
        )
    }

    pub fn is_defaultable(&self) -> bool {
        !matches!(
            self,
            ColumnType::Primary | ColumnType::BigPrimary | ColumnType::Text
        )
    }

    pub fn is_unsignable(&self) -> bool {
        matches!(
            self,
            ColumnType::Primary
                | ColumnType::BigPrimary
                | ColumnType::Int
                | ColumnType::TinyInt
                | ColumnType::BigInt
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = CreateColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CreateColumnError::UnknownType(s.to_string()))
    }
}

/// Length of a lengthable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Length {
    /// Display width or character count, e.g. `varchar(255)`.
    Size(u32),
    /// `decimal(precision,scale)`.
    Precision(u32, u32),
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Size(size) => write!(f, "{size}"),
            Length::Precision(precision, scale) => write!(f, "{precision},{scale}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lengths() {
        assert_eq!(ColumnType::Primary.default_length(), Some(Length::Size(11)));
        assert_eq!(ColumnType::BigPrimary.default_length(), Some(Length::Size(20)));
        assert_eq!(ColumnType::Bool.default_length(), Some(Length::Size(1)));
        assert_eq!(ColumnType::TinyInt.default_length(), Some(Length::Size(1)));
        assert_eq!(ColumnType::String.default_length(), Some(Length::Size(255)));
        assert_eq!(
            ColumnType::Decimal.default_length(),
            Some(Length::Precision(10, 0))
        );
        assert_eq!(ColumnType::Text.default_length(), None);
        assert_eq!(ColumnType::Json.default_length(), None);
    }

    #[test]
    fn test_capabilities() {
        assert!(!ColumnType::Primary.is_nullable());
        assert!(!ColumnType::Bool.is_nullable());
        assert!(ColumnType::Bool.is_defaultable());
        assert!(!ColumnType::Bool.has_settable_length());
        assert!(!ColumnType::Decimal.has_settable_length());
        assert!(ColumnType::Text.is_nullable());
        assert!(!ColumnType::Text.is_defaultable());
        assert!(ColumnType::BigInt.is_unsignable());
        assert!(!ColumnType::String.is_unsignable());
    }

    #[test]
    fn test_parse_round_trips_every_type() {
        for column_type in ColumnType::ALL {
            assert_eq!(column_type.as_str().parse::<ColumnType>().ok(), Some(column_type));
        }
        assert!("varchar".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_serde_uses_schema_names() {
        let parsed: ColumnType = serde_json::from_str("\"bigPrimary\"").unwrap();
        assert_eq!(parsed, ColumnType::BigPrimary);
        assert_eq!(serde_json::to_string(&ColumnType::TinyInt).unwrap(), "\"tinyInt\"");
    }

    #[test]
    fn test_length_display() {
        assert_eq!(Length::Size(30).to_string(), "30");
        assert_eq!(Length::Precision(8, 2).to_string(), "8,2");
    }
}
