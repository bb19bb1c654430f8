//! Configuration for Tally
//!
//! Resolved in three layers, later layers winning:
//! 1. Built-in defaults (file storage under the platform data dir)
//! 2. A TOML file: an explicit path, else `~/.local/share/tally/config.toml`
//!    when it exists
//! 3. Environment variables (`TALLY_STORAGE`, `TALLY_DATA_FILE`,
//!    `TALLY_PAGE_SIZE`)
//!
//! ```toml
//! [storage]
//! backend = "file"          # or "memory"
//! path = "/home/me/ledger/master-data.json"
//!
//! [list]
//! page_size = 25
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable selecting the storage backend
pub const STORAGE_ENV: &str = "TALLY_STORAGE";
/// Environment variable overriding the master data file path
pub const DATA_FILE_ENV: &str = "TALLY_DATA_FILE";
/// Environment variable overriding the list page size
pub const PAGE_SIZE_ENV: &str = "TALLY_PAGE_SIZE";

const DEFAULT_PAGE_SIZE: usize = 25;

/// Which persistence backend the store is injected with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// JSON document on disk
    #[default]
    File,
    /// In-process key-value fallback
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" | "kv" => Ok(Self::Memory),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageKind,
    /// Master data file (file backend only)
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    pub page_size: usize,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageConfig,
    pub list: ListConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageKind::File,
                path: default_data_path(),
            },
            list: ListConfig {
                page_size: DEFAULT_PAGE_SIZE,
            },
        }
    }
}

/// Default data directory (`~/.local/share/tally` on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
}

/// Default master data file
pub fn default_data_path() -> PathBuf {
    default_data_dir().join("master-data.json")
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

impl Config {
    /// Load config from file and environment
    ///
    /// An explicit `override_path` must exist; the default location is
    /// optional.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut config = match override_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse config from TOML content on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(storage) = raw.storage {
            if let Some(backend) = storage.backend {
                config.storage.backend = backend.parse().map_err(Error::Config)?;
            }
            if let Some(path) = storage.path {
                config.storage.path = path;
            }
        }

        if let Some(list) = raw.list {
            if let Some(page_size) = list.page_size {
                config.list.page_size = page_size;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(STORAGE_ENV) {
            self.storage.backend = backend.parse().map_err(Error::Config)?;
        }
        if let Some(path) = lookup(DATA_FILE_ENV).filter(|p| !p.trim().is_empty()) {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(size) = lookup(PAGE_SIZE_ENV) {
            self.list.page_size = size
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid {}: {}", PAGE_SIZE_ENV, size)))?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.list.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    storage: Option<RawStorage>,
    list: Option<RawList>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStorage {
    backend: Option<String>,
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawList {
    page_size: Option<usize>,
}
