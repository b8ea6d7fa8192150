//! Cache configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Database the viewer caches downloaded model files in
pub const DEFAULT_DATABASE_NAME: &str = "three-viewer-cache";
/// Record store holding the cached files
pub const DEFAULT_STORE_NAME: &str = "files";
/// Schema version the cache opens its database at
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;
/// Environment variable overriding the default cache directory
pub const CACHE_DIR_ENV: &str = "VIEWER_CACHE_DIR";

/// Persistent cache settings
///
/// Loadable from `.toml` or `.ron` through [`Config`]. Missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the database holding the record store
    pub database_name: String,
    /// Name of the single record store
    pub store_name: String,
    /// Schema version; raising it re-runs store creation
    pub version: u32,
    /// Directory the file backend keeps databases in
    pub root_dir: PathBuf,
}

impl CacheConfig {
    /// Default settings with databases kept under `root_dir`
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Use a different database name
    #[must_use]
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    /// Use a different record store name
    #[must_use]
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Open the database at a different schema version
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Directory resolved for the default cache
    ///
    /// `$VIEWER_CACHE_DIR` if set, else the platform's local data directory,
    /// else the temp directory.
    pub fn default_root_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("viewer-cache")
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            version: DEFAULT_SCHEMA_VERSION,
            root_dir: Self::default_root_dir(),
        }
    }
}

impl Config for CacheConfig {}
