//! Database configuration.
//!
//! Named databases live under `databases.<name>` in `config/config.toml`:
//!
//! ```toml
//! [databases.shop]
//! driver = "mysql"
//! host = "localhost"
//! port = 3306
//! database = "shop"
//! username = "root"
//! password = ""
//! engine = "InnoDB"
//! ```
//!
//! Every key can be overridden from the environment, for example
//! `SCHEMASYNC__DATABASES__SHOP__HOST=db.internal`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub const CONFIG_FILE: &str = "config/config.toml";
pub const ENV_PREFIX: &str = "SCHEMASYNC";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Full connection URL; takes precedence over the individual fields.
    #[serde(default)]
    pub dsn: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Extra URL query options such as `prefer_socket`.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
}

fn default_driver() -> String {
    "mysql".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_username() -> String {
    "root".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: default_host(),
            port: default_port(),
            database: String::new(),
            charset: default_charset(),
            dsn: None,
            username: default_username(),
            password: String::new(),
            options: BTreeMap::new(),
            engine: None,
            collation: None,
        }
    }
}

impl DatabaseConfig {
    /// Loads `databases.<name>` from `config/config.toml` and the environment.
    pub fn load(name: &str) -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE, name)
    }

    /// Loads `databases.<name>` from `path` (optional) and the environment.
    pub fn load_from(path: impl AsRef<Path>, name: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let environment = || {
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
        };

        let settings = match Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment())
            .build()
        {
            Ok(settings) => settings,
            Err(err) => {
                // An unreadable file falls back to the environment alone.
                if path.exists() {
                    log::warn!(
                        "Failed to load {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings
            .get::<DatabaseConfig>(&format!("databases.{name}"))
            .map_err(|e| {
                ConfigError::Message(format!(
                    "Database `{name}` could not be loaded from file or environment: {e}"
                ))
            })
    }

    /// Connection URL: `dsn` when set, otherwise built from the fields.
    pub fn to_dsn(&self) -> String {
        if let Some(dsn) = self.dsn.as_deref().filter(|d| !d.is_empty()) {
            return dsn.to_string();
        }

        let credentials = if self.password.is_empty() {
            self.username.clone()
        } else {
            format!("{}:{}", self.username, self.password)
        };
        let mut dsn = format!(
            "{}://{}@{}:{}/{}",
            self.driver, credentials, self.host, self.port, self.database
        );
        let options: Vec<String> = self
            .options
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if !options.is_empty() {
            dsn.push('?');
            dsn.push_str(&options.join("&"));
        }
        dsn
    }

    /// Table defaults handed to the [`Database`](crate::database::Database).
    pub fn to_parameters(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("charset".into(), Value::from(self.charset.as_str()));
        if let Some(engine) = &self.engine {
            parameters.insert("engine".into(), Value::from(engine.as_str()));
        }
        if let Some(collation) = &self.collation {
            parameters.insert("collation".into(), Value::from(collation.as_str()));
        }
        parameters
    }
}
