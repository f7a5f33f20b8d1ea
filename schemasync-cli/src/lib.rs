//! Table definition loading for the `schemasync` CLI.
//!
//! A definition file is TOML or JSON and holds either one table or a
//! `tables` list:
//!
//! ```toml
//! [[tables]]
//! name = "products"
//! columns = [
//!     { type = "primary", name = "id" },
//!     { type = "string", name = "name", length = 100 },
//! ]
//! ```

use anyhow::{bail, Context, Result};
use schemasync::schema::factory::TableFactory;
use schemasync::schema::Table;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Parses definition text; `extension` selects the format.
pub fn parse_definition(text: &str, extension: &str) -> Result<Value> {
    match extension {
        "toml" => {
            let value: toml::Value = toml::from_str(text).context("Invalid TOML definition")?;
            serde_json::to_value(value).context("Unrepresentable TOML definition")
        }
        "json" => serde_json::from_str(text).context("Invalid JSON definition"),
        other => bail!("Unsupported definition format `{}` (use .toml or .json)", other),
    }
}

/// Tables declared in `definition`. Item files resolve against `base_dir`.
pub fn tables_from_value(definition: &Value, base_dir: Option<&Path>) -> Result<Vec<Table>> {
    let definitions: Vec<&Value> = match definition.get("tables") {
        Some(Value::Array(tables)) => tables.iter().collect(),
        Some(_) => bail!("`tables` must be a list"),
        None => vec![definition],
    };

    definitions
        .into_iter()
        .map(|table| {
            TableFactory::create_table_from_value_in(table, base_dir)
                .context("Invalid table definition")
        })
        .collect()
}

/// Loads every table declared in the file at `path`.
pub fn load_tables(path: &Path) -> Result<Vec<Table>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let definition = parse_definition(&text, &extension)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let tables = tables_from_value(&definition, path.parent())?;
    if tables.is_empty() {
        bail!("{} declares no tables", path.display());
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_single_table() {
        let definition = parse_definition(
            r#"
            name = "products"
            columns = [{ type = "primary", name = "id" }]
            "#,
            "toml",
        )
        .unwrap();

        let tables = tables_from_value(&definition, None).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name(), "products");
        assert!(tables[0].get_column("id").is_some_and(|c| c.is_primary()));
    }

    #[test]
    fn test_parse_json_table_list() {
        let definition = parse_definition(
            r#"{"tables": [{"name": "a"}, {"name": "b", "drop": true}]}"#,
            "json",
        )
        .unwrap();

        let tables = tables_from_value(&definition, None).unwrap();
        let names: Vec<&str> = tables.iter().map(Table::name).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(tables[1].is_dropping());
    }

    #[test]
    fn test_load_demo_definition() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/shop.toml");
        let tables = load_tables(&path).unwrap();

        let names: Vec<&str> = tables.iter().map(Table::name).collect();
        assert_eq!(names, ["products", "orders"]);
        let items = tables[0].get_items().unwrap();
        assert_eq!(items.chunk_length(), 50);
        assert_eq!(items.rows().count(), 3);
        assert!(tables[0].get_index("name_idx").is_some_and(|i| i.is_unique()));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_tables(Path::new("does/not/exist.toml")).is_err());
    }

    #[test]
    fn test_unsupported_format() {
        assert!(parse_definition("", "yaml").is_err());
    }

    #[test]
    fn test_invalid_table() {
        let definition = serde_json::json!({"columns": []});
        assert!(tables_from_value(&definition, None).is_err());
    }
}
