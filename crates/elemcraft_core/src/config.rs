//! Runtime configuration.
//!
//! # Responsibility
//! - Hold tunables for resolution, storage locations and logging.
//! - Load them from an optional JSON file with per-field defaults.
//! - Build the configured pair store and catalog store.
//!
//! # Invariants
//! - A validated config has a non-zero generation timeout and label cap.

use crate::catalog::{CatalogStore, InMemoryCatalogStore, JsonFileCatalogStore};
use crate::db::{open_db, open_db_in_memory};
use crate::logging::default_log_level;
use crate::repo::pair_repo::{RepoResult, SqlitePairRepository};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_MAX_LABEL_CHARS: usize = 32;

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Top-level configuration for the crafting core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftConfig {
    /// Upper bound for one generator call.
    pub generation_timeout_ms: u64,
    /// Longest accepted generated label, in characters.
    pub max_label_chars: usize,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite pair store; in-memory when unset.
    pub database_path: Option<PathBuf>,
    /// JSON catalog of discovered elements; in-memory when unset.
    pub catalog_path: Option<PathBuf>,
}

impl Default for CraftConfig {
    fn default() -> Self {
        Self {
            generation_timeout_ms: DEFAULT_GENERATION_TIMEOUT_MS,
            max_label_chars: DEFAULT_MAX_LABEL_CHARS,
            log_level: default_log_level().to_string(),
            log_dir: None,
            database_path: None,
            catalog_path: None,
        }
    }
}

impl CraftConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_timeout_ms == 0 {
            return Err(ConfigError::Invalid("generation_timeout_ms must be > 0"));
        }
        if self.max_label_chars == 0 {
            return Err(ConfigError::Invalid("max_label_chars must be > 0"));
        }
        Ok(())
    }

    /// Settings consumed by the combination resolver.
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            generation_timeout: Duration::from_millis(self.generation_timeout_ms),
            max_label_chars: self.max_label_chars,
        }
    }

    /// Opens the pair store at `database_path`, or an in-memory one.
    pub fn open_pair_store(&self) -> RepoResult<SqlitePairRepository> {
        let conn = match &self.database_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        SqlitePairRepository::try_new(conn)
    }

    /// Catalog store backed by `catalog_path`, or kept in memory.
    pub fn catalog_store(&self) -> Box<dyn CatalogStore + Send> {
        match &self.catalog_path {
            Some(path) => Box::new(JsonFileCatalogStore::new(path)),
            None => Box::new(InMemoryCatalogStore::new()),
        }
    }
}

/// Resolution tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    pub generation_timeout: Duration,
    pub max_label_chars: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        CraftConfig::default().resolver_settings()
    }
}
