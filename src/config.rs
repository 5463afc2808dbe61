//! Configuration for shelfdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a shelfdb store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Name of the store, used as the backing table identifier.
    /// Must be ASCII alphanumeric/underscore, not start with a digit,
    /// and be at most 64 bytes. Validated at open.
    pub name: String,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the database file (and backup snapshots).
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── shelf.db             (SQLite database)
    ///     └── <backup>.sqlite3     (backup snapshots)
    pub data_dir: PathBuf,

    /// Use an ephemeral in-memory database instead of a file
    pub memory: bool,

    /// Fail at open if the database file does not already exist
    pub file_must_exist: bool,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Budget for lock acquisition on the backing store (milliseconds)
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "shelf".to_string(),
            data_dir: PathBuf::from("."),
            memory: false,
            file_must_exist: false,
            timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store name (the backing table identifier)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the data directory (where the database file lives)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Use an in-memory database (nothing is persisted)
    pub fn memory(mut self, memory: bool) -> Self {
        self.config.memory = memory;
        self
    }

    /// Require the database file to already exist at open
    pub fn file_must_exist(mut self, must_exist: bool) -> Self {
        self.config.file_must_exist = must_exist;
        self
    }

    /// Set the lock acquisition timeout (in milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
