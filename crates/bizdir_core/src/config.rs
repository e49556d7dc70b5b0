//! Layered configuration using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. TOML file (`bizdir.toml` in the working directory, or an explicit path)
//! 3. Environment variables: `BIZDIR_*` (e.g. `BIZDIR_DATABASE_PATH`)
//!
//! ```toml
//! [database]
//! path = "/var/lib/bizdir/bizdir.sqlite3"
//!
//! [log]
//! level = "info"
//! dir = "/var/log/bizdir"
//! ```

use crate::logging::default_log_level;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "bizdir.toml";
pub const DEFAULT_DATABASE_FILE: &str = "bizdir.sqlite3";

/// Boxed figment error, keeps `Result<Config, _>` small.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ConfigError(Box<figment::Error>);

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path. Created and migrated on first open.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: PathBuf::from(DEFAULT_DATABASE_FILE),
            },
            log: LogConfig {
                level: default_log_level().to_string(),
                dir: None,
            },
        }
    }
}

impl Config {
    /// Loads defaults → TOML file → environment.
    ///
    /// A missing file is not an error; `file` defaults to `bizdir.toml`.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::from_figment(
            Self::base_figment()
                .merge(Toml::file(file))
                .merge(Env::prefixed("BIZDIR_").split("_")),
        )
    }

    /// Figment holding only the built-in defaults.
    pub fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(ConfigError::from)
    }
}
