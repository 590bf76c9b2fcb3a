//! Store configuration loaded from environment variables.
//!
//! # Responsibility
//! - Pick the data directory, storage backend and log settings.
//! - Derive the on-disk locations each backend uses.
//!
//! # Invariants
//! - Every setting has a default; only malformed values are errors.

use crate::logging::default_log_level;
use crate::manager::DOCUMENT_FILE_NAME;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const HOME_ENV: &str = "QBACKUP_HOME";
pub const BACKEND_ENV: &str = "QBACKUP_BACKEND";
pub const LOG_LEVEL_ENV: &str = "QBACKUP_LOG_LEVEL";
pub const LOG_ENABLED_ENV: &str = "QBACKUP_LOG_ENABLED";

const DEFAULT_HOME_DIR: &str = ".qbackup";
const DATABASE_FILE_NAME: &str = "qbackup.db";
const LOG_DIR_NAME: &str = "logs";

/// Storage backend selected for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Locked JSON document under the home directory.
    #[default]
    Document,
    /// SQLite database under the home directory.
    Sqlite,
    /// Process-local; nothing survives exit.
    Memory,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "json" => Ok(Self::Document),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidBackend(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBackend(value) => write!(
                f,
                "unsupported backend `{value}`; expected document|sqlite|memory"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Top-level store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Data directory; also the directory guarded by the lock connector.
    pub home: PathBuf,
    pub backend: Backend,
    pub log_level: String,
    pub log_enabled: bool,
}

impl StoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup(HOME_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_home(lookup("HOME")));

        let backend = match lookup(BACKEND_ENV) {
            Some(value) => value.parse()?,
            None => Backend::default(),
        };

        let log_level = lookup(LOG_LEVEL_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_log_level().to_string());
        let log_enabled = parse_bool(lookup(LOG_ENABLED_ENV).as_deref(), true);

        Ok(Self {
            home,
            backend,
            log_level,
            log_enabled,
        })
    }

    pub fn document_path(&self) -> PathBuf {
        self.home.join(DOCUMENT_FILE_NAME)
    }

    pub fn database_path(&self) -> PathBuf {
        self.home.join(DATABASE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join(LOG_DIR_NAME)
    }
}

fn default_home(user_home: Option<String>) -> PathBuf {
    match user_home {
        Some(dir) if !dir.is_empty() => Path::new(&dir).join(DEFAULT_HOME_DIR),
        _ => PathBuf::from(DEFAULT_HOME_DIR),
    }
}

/// Accepts `true`/`1`/`false`/`0` (case-insensitive); anything else is `default`.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, ConfigError, StoreConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(vars: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_use_home_directory() {
        let config = load(&[("HOME", "/home/user")]).unwrap();
        assert_eq!(config.home, PathBuf::from("/home/user/.qbackup"));
        assert_eq!(config.backend, Backend::Document);
        assert!(config.log_enabled);
        assert_eq!(config.document_path(), PathBuf::from("/home/user/.qbackup/config.json"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = load(&[
            ("QBACKUP_HOME", "/srv/qbackup"),
            ("QBACKUP_BACKEND", "SQLite"),
            ("QBACKUP_LOG_LEVEL", "warn"),
            ("QBACKUP_LOG_ENABLED", "0"),
        ])
        .unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.log_level, "warn");
        assert!(!config.log_enabled);
        assert_eq!(config.database_path(), PathBuf::from("/srv/qbackup/qbackup.db"));
        assert_eq!(config.log_dir(), PathBuf::from("/srv/qbackup/logs"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = load(&[("QBACKUP_BACKEND", "redis")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidBackend("redis".to_string()));
    }

    #[test]
    fn missing_home_falls_back_to_relative_dir() {
        let config = load(&[]).unwrap();
        assert_eq!(config.home, PathBuf::from(".qbackup"));
    }
}
