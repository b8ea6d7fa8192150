//! Persistent key-value cache
//!
//! Durable storage of opaque values under string keys, surviving restarts.
//! The viewer uses it to keep downloaded model files between sessions.
//!
//! ```text
//! PersistentCache (get / set / delete, lazy shared open)
//!      ↓
//! Connection (one transaction per request)
//!      ↓
//! StorageBackend (FileBackend on disk, MemoryBackend in process)
//! ```
//!
//! The free functions [`get`], [`set`] and [`delete`] work on a process-wide
//! default cache. It is created on first use from [`CacheConfig::default`]
//! unless the host installs its own with [`install_default`] beforehand.

mod backend;
mod config;
mod error;
mod file_backend;
mod memory_backend;
mod persistent_cache;
mod request;
mod transaction;

use std::sync::OnceLock;

pub use backend::{plan_open, Connection, StorageBackend, UpgradeHandler, UpgradeTransaction};
pub use config::{CacheConfig, CACHE_DIR_ENV, DEFAULT_DATABASE_NAME, DEFAULT_SCHEMA_VERSION, DEFAULT_STORE_NAME};
pub use error::{StorageError, StorageOperation};
pub use file_backend::FileBackend;
pub use memory_backend::MemoryBackend;
pub use persistent_cache::PersistentCache;
pub use transaction::{StoreTransaction, TransactionMode};

static DEFAULT_CACHE: OnceLock<PersistentCache> = OnceLock::new();

/// Install the process-wide default cache
///
/// Fails, handing the cache back, if a default is already in place (either
/// installed earlier or created by a previous free-function call).
pub fn install_default(cache: PersistentCache) -> Result<(), PersistentCache> {
    DEFAULT_CACHE.set(cache)
}

/// The process-wide default cache, created on disk from defaults if needed
pub fn default_cache() -> &'static PersistentCache {
    DEFAULT_CACHE.get_or_init(|| {
        let config = CacheConfig::default();
        log::info!("Using default cache directory {}", config.root_dir.display());
        PersistentCache::on_disk(config)
    })
}

/// Read `key` from the default cache
pub async fn get(key: &str) -> Result<Option<Vec<u8>>, StorageError> {
    default_cache().get(key).await
}

/// Write `value` under `key` in the default cache
pub async fn set(key: &str, value: impl Into<Vec<u8>>) -> Result<(), StorageError> {
    default_cache().set(key, value).await
}

/// Remove `key` from the default cache
pub async fn delete(key: &str) -> Result<(), StorageError> {
    default_cache().delete(key).await
}
