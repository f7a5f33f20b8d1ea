//! Named database registry.
//!
//! Databases are added ready-made or registered as factories that connect on
//! first use. Default aliases map a role such as `primary` to a name.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::database::Database;

/// A database shared between callers; hold the lock for a whole run.
pub type SharedDatabase = Arc<Mutex<Database>>;

type Factory = Box<dyn FnOnce(&str) -> Result<Database, ConnectionError> + Send>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Database `{0}` not found")]
    NotFound(String),

    #[error("No default database for `{0}`")]
    NoDefault(String),

    #[error("Failed to create database `{name}`: {source}")]
    Create {
        name: String,
        #[source]
        source: ConnectionError,
    },
}

#[derive(Default)]
pub struct Databases {
    databases: HashMap<String, SharedDatabase>,
    factories: HashMap<String, Factory>,
    defaults: HashMap<String, String>,
}

impl Databases {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Adds a database under its own name, replacing any earlier entry.
    pub fn add(&mut self, database: Database) -> &mut Self {
        let name = database.name().to_string();
        self.factories.remove(&name);
        self.databases.insert(name, Arc::new(Mutex::new(database)));
        self
    }

    /// Registers a factory called with the name on first [`get`](Self::get).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl FnOnce(&str) -> Result<Database, ConnectionError> + Send + 'static,
    ) -> &mut Self {
        let name = name.into();
        self.databases.remove(&name);
        self.factories.insert(name, Box::new(factory));
        self
    }

    pub fn get(&mut self, name: &str) -> Result<SharedDatabase, RegistryError> {
        if let Some(database) = self.databases.get(name) {
            return Ok(Arc::clone(database));
        }

        let factory = self
            .factories
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let database = factory(name).map_err(|source| RegistryError::Create {
            name: name.to_string(),
            source,
        })?;
        log::debug!("Created database `{}`", name);

        let database = Arc::new(Mutex::new(database));
        self.databases.insert(name.to_string(), Arc::clone(&database));
        Ok(database)
    }

    pub fn has(&self, name: &str) -> bool {
        self.databases.contains_key(name) || self.factories.contains_key(name)
    }

    /// Points the alias `role` at the database `name`.
    pub fn add_default(&mut self, role: impl Into<String>, name: impl Into<String>) -> &mut Self {
        self.defaults.insert(role.into(), name.into());
        self
    }

    pub fn default(&mut self, role: &str) -> Result<SharedDatabase, RegistryError> {
        let name = self
            .defaults
            .get(role)
            .cloned()
            .ok_or_else(|| RegistryError::NoDefault(role.to_string()))?;
        self.get(&name)
    }

    pub fn has_default(&self, role: &str) -> bool {
        self.defaults.contains_key(role)
    }

    /// Role to database name aliases.
    pub fn defaults(&self) -> &HashMap<String, String> {
        &self.defaults
    }

    /// Names of every added or registered database, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .databases
            .keys()
            .chain(self.factories.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Databases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Databases")
            .field("names", &self.names())
            .field("defaults", &self.defaults)
            .finish()
    }
}
