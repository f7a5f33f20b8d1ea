//! Declarative schema descriptors.
//!
//! A [`Table`] is built with fluent setters and then handed to a
//! [`Processor`](crate::processor::Processor), which converges the database
//! towards it.
//!
//! ```
//! use schemasync::schema::Table;
//!
//! let mut table = Table::new("products");
//! table.primary("id");
//! table.string("name").length(100).nullable(false);
//! table.bool("active").default(true);
//! table.index("name_idx").column("name").unique();
//! ```

pub mod chunk;
pub mod column;
pub mod column_type;
pub mod error;
pub mod factory;
pub mod index;
pub mod items;
pub mod table;

pub use column::{Column, ColumnKind};
pub use column_type::{ColumnType, Length};
pub use error::{CreateColumnError, CreateIndexError, CreateTableError, ItemsError};
pub use index::Index;
pub use items::{ItemFactory, ItemSource, Items, JsonFileItems, DEFAULT_CHUNK_LENGTH};
pub use table::Table;
