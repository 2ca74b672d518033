//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where the box store lives and how core logging is set up.
//! - Load settings from JSON or `BOXSTORE_*` environment variables.
//!
//! # Invariants
//! - A loaded config has already passed `validate()`.
//! - `max_id_attempts = None` means unbounded id allocation.

use crate::db::{open_db, DbResult};
use crate::id::AllocationPolicy;
use crate::logging::{default_log_level, init_logging, normalize_level, LoggingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "BOXSTORE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BOXSTORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BOXSTORE_LOG_DIR";
pub const ENV_MAX_ID_ATTEMPTS: &str = "BOXSTORE_MAX_ID_ATTEMPTS";

/// Configuration loading/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// Config text is not valid JSON for `CoreConfig`.
    Parse(serde_json::Error),
    /// A required setting is absent.
    Missing(&'static str),
    /// A setting is present but unusable.
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, message } => write!(f, "invalid setting `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings needed to open the store and start logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    #[serde(default = "default_level_string")]
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Ceiling on id allocation attempts.
    #[serde(default)]
    pub max_id_attempts: Option<u32>,
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

impl CoreConfig {
    /// Creates a config with defaults for everything but the database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_level: default_level_string(),
            log_dir: None,
            max_id_attempts: None,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from any key/value source using the `BOXSTORE_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup(ENV_DB_PATH)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_DB_PATH))?;

        let mut config = Self::new(db_path.trim());
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = lookup(ENV_LOG_DIR)
            .filter(|value| !value.trim().is_empty())
            .map(|value| PathBuf::from(value.trim()));
        if let Some(raw) = lookup(ENV_MAX_ID_ATTEMPTS) {
            let parsed = raw.trim().parse::<u32>().map_err(|err| ConfigError::Invalid {
                key: ENV_MAX_ID_ATTEMPTS,
                message: format!("`{raw}` is not a non-negative integer: {err}"),
            })?;
            config.max_id_attempts = Some(parsed);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("db_path"));
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::Invalid {
            key: "log_level",
            message: err.to_string(),
        })?;
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    key: "log_dir",
                    message: format!("must be an absolute path, got `{}`", log_dir.display()),
                });
            }
        }
        if self.max_id_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                key: "max_id_attempts",
                message: "must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn id_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            max_attempts: self.max_id_attempts,
        }
    }

    /// Starts file logging when `log_dir` is set; a no-op otherwise.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(());
        };
        let log_dir = log_dir.to_str().ok_or_else(|| {
            LoggingError::InvalidLogDir(format!("`{}` is not valid UTF-8", log_dir.display()))
        })?;
        init_logging(&self.log_level, log_dir)
    }

    /// Opens and migrates the configured database.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }
}
