//! Seed items attached to a table.
//!
//! An [`ItemSource`] produces the rows; [`Items`] wraps a source with the
//! insert policy (chunk length, transaction use, forced insert). Sources are
//! restartable: every call to [`ItemSource::rows`] starts from the first row.

use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chunk::{ChunkExt, Chunks};
use super::error::ItemsError;
use crate::Row;

/// Rows inserted per `INSERT` statement unless configured otherwise.
pub const DEFAULT_CHUNK_LENGTH: usize = 10;

/// A finite, restartable sequence of rows.
pub trait ItemSource: Send + Sync {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_>;
}

impl ItemSource for Vec<Row> {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        Box::new(self.iter().cloned())
    }
}

/// Rows produced by calling a closure a fixed number of times.
pub struct ItemFactory {
    callback: Box<dyn Fn() -> Row + Send + Sync>,
    number: usize,
}

impl ItemFactory {
    /// Factory producing one row until [`create`](Self::create) says otherwise.
    pub fn new(callback: impl Fn() -> Row + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            number: 1,
        }
    }

    /// Number of rows to produce.
    pub fn create(mut self, number: usize) -> Self {
        self.number = number;
        self
    }
}

impl ItemSource for ItemFactory {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        Box::new((0..self.number).map(|_| (self.callback)()))
    }
}

/// Rows read from a JSON file holding an array of objects.
pub struct JsonFileItems {
    path: PathBuf,
    data: Vec<Row>,
    mapper: Option<Box<dyn Fn(Row) -> Row + Send + Sync>>,
}

impl JsonFileItems {
    /// Reads and parses `path` immediately.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ItemsError> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path).map_err(|source| ItemsError::Read {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|source| ItemsError::Parse {
            path: path.clone(),
            source,
        })?;

        let Value::Array(entries) = value else {
            return Err(ItemsError::Shape { path });
        };
        let mut data = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Value::Object(row) => data.push(row),
                _ => return Err(ItemsError::Shape { path }),
            }
        }

        log::debug!("Loaded {} items from {}", data.len(), path.display());
        Ok(Self {
            path,
            data,
            mapper: None,
        })
    }

    /// Transform every row before it is handed out.
    pub fn map(mut self, mapper: impl Fn(Row) -> Row + Send + Sync + 'static) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemSource for JsonFileItems {
    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        let rows = self.data.iter().cloned();
        match &self.mapper {
            Some(mapper) => Box::new(rows.map(move |row| mapper(row))),
            None => Box::new(rows),
        }
    }
}

/// Seed items of a table plus their insert policy.
#[derive(Clone)]
pub struct Items {
    source: Arc<dyn ItemSource>,
    chunk_length: usize,
    use_transaction: bool,
    force_insert: bool,
}

impl Items {
    pub fn new(source: impl ItemSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            chunk_length: DEFAULT_CHUNK_LENGTH,
            use_transaction: true,
            force_insert: false,
        }
    }

    /// Number of rows per `INSERT`; `0` inserts everything at once.
    pub fn chunk(mut self, length: usize) -> Self {
        self.chunk_length = length;
        self
    }

    /// Whether the inserts may run inside the processing transaction.
    pub fn use_transaction(mut self, use_transaction: bool) -> Self {
        self.use_transaction = use_transaction;
        self
    }

    /// Insert even when the table already holds rows.
    pub fn force_insert(mut self, force_insert: bool) -> Self {
        self.force_insert = force_insert;
        self
    }

    pub fn chunk_length(&self) -> usize {
        self.chunk_length
    }

    pub fn with_transaction(&self) -> bool {
        self.use_transaction
    }

    pub fn forcing_insert(&self) -> bool {
        self.force_insert
    }

    pub fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        self.source.rows()
    }

    /// Rows grouped by the configured chunk length.
    pub fn chunks(&self) -> Chunks<Box<dyn Iterator<Item = Row> + '_>> {
        self.source.rows().chunked(self.chunk_length)
    }
}

impl From<Vec<Row>> for Items {
    fn from(rows: Vec<Row>) -> Self {
        Items::new(rows)
    }
}

impl fmt::Debug for Items {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Items")
            .field("chunk_length", &self.chunk_length)
            .field("use_transaction", &self.use_transaction)
            .field("force_insert", &self.force_insert)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_policy_defaults() {
        let items = Items::new(Vec::<Row>::new());
        assert_eq!(items.chunk_length(), DEFAULT_CHUNK_LENGTH);
        assert!(items.with_transaction());
        assert!(!items.forcing_insert());

        let items = items.chunk(15).use_transaction(false).force_insert(true);
        assert_eq!(items.chunk_length(), 15);
        assert!(!items.with_transaction());
        assert!(items.forcing_insert());
    }

    #[test]
    fn test_rows_are_restartable() {
        let items = Items::from(vec![row(json!({"a": 1})), row(json!({"a": 2}))]);
        assert_eq!(items.rows().count(), 2);
        assert_eq!(items.rows().count(), 2);
    }

    #[test]
    fn test_chunks() {
        let rows: Vec<Row> = (0..5).map(|i| row(json!({ "n": i }))).collect();
        let items = Items::from(rows).chunk(2);
        let sizes: Vec<usize> = items.chunks().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_item_factory() {
        let factory = ItemFactory::new(|| row(json!({"foo": "bar"}))).create(2);
        let rows: Vec<Row> = factory.rows().collect();
        assert_eq!(rows, vec![row(json!({"foo": "bar"})), row(json!({"foo": "bar"}))]);

        let empty = ItemFactory::new(Row::new).create(0);
        assert_eq!(empty.rows().count(), 0);
    }

    #[test]
    fn test_json_file_items_with_mapper() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"iso": "DE", "country": "Germany"}}, {{"iso": "CH", "country": "Switzerland"}}]"#
        )
        .unwrap();

        let items = JsonFileItems::open(file.path()).unwrap();
        let rows: Vec<Row> = items.rows().collect();
        assert_eq!(rows[1], row(json!({"iso": "CH", "country": "Switzerland"})));

        let mapped = items.map(|r| {
            let mut out = Row::new();
            out.insert("iso".into(), r["iso"].clone());
            out.insert("name".into(), r["country"].clone());
            out
        });
        let rows: Vec<Row> = mapped.rows().collect();
        assert_eq!(rows[0], row(json!({"iso": "DE", "name": "Germany"})));
    }

    #[test]
    fn test_json_file_items_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"iso": "DE"}}"#).unwrap();
        assert!(matches!(
            JsonFileItems::open(file.path()),
            Err(ItemsError::Shape { .. })
        ));
    }

    #[test]
    fn test_json_file_items_missing_file() {
        assert!(matches!(
            JsonFileItems::open("/nonexistent/items.json"),
            Err(ItemsError::Read { .. })
        ));
    }
}
