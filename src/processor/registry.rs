//! Dispatch to the first member supporting a database.

use super::error::{ProcessError, StorageFetchError, StorageStoreError};
use super::statement::Statements;
use super::{Processor, Storage};
use crate::database::Database;
use crate::schema::Table;

/// A list of processors acting as one.
#[derive(Default)]
pub struct Processors {
    processors: Vec<Box<dyn Processor>>,
}

impl Processors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    fn find(&self, database: &Database) -> Result<&dyn Processor, ProcessError> {
        self.processors
            .iter()
            .find(|p| p.supports(database))
            .map(|p| p.as_ref())
            .ok_or_else(|| ProcessError::Unsupported {
                database: database.name().to_string(),
                driver: database.driver_name().to_string(),
            })
    }
}

impl Processor for Processors {
    fn supports(&self, database: &Database) -> bool {
        self.processors.iter().any(|p| p.supports(database))
    }

    fn process(&self, table: &Table, database: &mut Database) -> Result<(), ProcessError> {
        self.find(database)?.process(table, database)
    }

    fn plan(&self, table: &Table, database: &mut Database) -> Result<Statements, ProcessError> {
        self.find(database)?.plan(table, database)
    }
}

/// A list of storages acting as one.
#[derive(Default)]
pub struct Storages {
    storages: Vec<Box<dyn Storage>>,
}

impl Storages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, storage: impl Storage + 'static) -> Self {
        self.storages.push(Box::new(storage));
        self
    }

    fn find(&self, database: &Database) -> Option<&dyn Storage> {
        self.storages
            .iter()
            .find(|s| s.supports(database))
            .map(|s| s.as_ref())
    }
}

impl Storage for Storages {
    fn supports(&self, database: &Database) -> bool {
        self.find(database).is_some()
    }

    fn fetch_table(
        &self,
        database: &mut Database,
        name: &str,
    ) -> Result<Option<Table>, StorageFetchError> {
        match self.find(database) {
            Some(storage) => storage.fetch_table(database, name),
            None => Err(StorageFetchError::Unsupported {
                database: database.name().to_string(),
                driver: database.driver_name().to_string(),
            }),
        }
    }

    fn store_table(&self, database: &mut Database, table: &Table) -> Result<(), StorageStoreError> {
        match self.find(database) {
            Some(storage) => storage.store_table(database, table),
            None => Err(StorageStoreError::Unsupported {
                database: database.name().to_string(),
                driver: database.driver_name().to_string(),
            }),
        }
    }
}
