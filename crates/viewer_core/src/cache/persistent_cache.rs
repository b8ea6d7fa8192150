//! Persistent key-value cache
//!
//! Opaque byte values stored under string keys in a single record store.
//! The database connection is opened lazily on first use and shared by all
//! later operations; concurrent first callers wait on the same open.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::backend::{Connection, StorageBackend, UpgradeTransaction};
use super::config::CacheConfig;
use super::error::StorageError;
use super::file_backend::FileBackend;
use super::memory_backend::MemoryBackend;

/// Key-value cache over one record store of a storage backend
#[derive(Debug)]
pub struct PersistentCache {
    config: CacheConfig,
    backend: Arc<dyn StorageBackend>,
    connection: OnceCell<Arc<dyn Connection>>,
}

impl PersistentCache {
    /// Create a cache over `backend`; nothing is opened until the first operation
    pub fn new(config: CacheConfig, backend: impl StorageBackend + 'static) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            connection: OnceCell::new(),
        }
    }

    /// Cache persisted on disk under `config.root_dir`
    pub fn on_disk(config: CacheConfig) -> Self {
        let backend = FileBackend::new(config.root_dir.clone());
        Self::new(config, backend)
    }

    /// Cache kept in process memory
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(config, MemoryBackend::new())
    }

    /// Settings this cache was created with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether the database connection has been established
    pub fn is_open(&self) -> bool {
        self.connection.initialized()
    }

    /// Ensure the database and its store exist, returning the shared connection
    ///
    /// A failed open is not remembered; the next operation tries again.
    async fn ready(&self) -> Result<&Arc<dyn Connection>, StorageError> {
        self.connection.get_or_try_init(|| self.open()).await
    }

    async fn open(&self) -> Result<Arc<dyn Connection>, StorageError> {
        let store = self.config.store_name.clone();
        let ensure_store = move |upgrade: &mut UpgradeTransaction| -> Result<(), StorageError> {
            log::debug!(
                "Upgrading cache schema from v{} to v{}",
                upgrade.old_version(),
                upgrade.new_version()
            );
            if !upgrade.contains_store(&store) {
                upgrade.create_store(&store)?;
            }
            Ok(())
        };

        log::debug!(
            "Opening cache database '{}' v{}",
            self.config.database_name,
            self.config.version
        );
        self.backend
            .open(&self.config.database_name, self.config.version, &ensure_store)
            .await
            .inspect_err(|err| log::warn!("Cache database unavailable: {}", err))
    }

    /// Stored value for `key`, or `None` when nothing is cached under it
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let connection = self.ready().await?;
        log::trace!("cache get '{}'", key);
        connection.get(&self.config.store_name, key).await
    }

    /// Store `value` under `key`, replacing any previous value
    pub async fn set(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<(), StorageError> {
        let connection = self.ready().await?;
        let value = value.into();
        log::trace!("cache set '{}' ({} bytes)", key, value.len());
        connection.put(&self.config.store_name, key, value).await
    }

    /// Remove any value under `key`
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let connection = self.ready().await?;
        log::trace!("cache delete '{}'", key);
        connection.delete(&self.config.store_name, key).await
    }

    /// Whether a value is cached under `key`
    pub async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Decode the value under `key` as `T`
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode `value` and store it under `key`
    pub async fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = bincode::serialize(value)?;
        self.set(key, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::UpgradeHandler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_cache() -> PersistentCache {
        crate::foundation::logging::init();
        PersistentCache::in_memory(CacheConfig::new("unused"))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = memory_cache();
        cache.set("model.glb", vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.get("model.glb").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let cache = memory_cache();
        assert_eq!(cache.get("never-set").await.unwrap(), None);
        assert!(!cache.contains("never-set").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_last_write_wins() {
        let cache = memory_cache();
        cache.set("k", b"first".to_vec()).await.unwrap();
        cache.set("k", b"second".to_vec()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = memory_cache();
        cache.delete("missing").await.unwrap();

        cache.set("k", vec![0]).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_values() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Entry {
            name: String,
            size: u64,
        }

        let cache = memory_cache();
        let entry = Entry { name: "helmet.glb".into(), size: 4096 };
        cache.set_as("entry", &entry).await.unwrap();
        assert_eq!(cache.get_as::<Entry>("entry").await.unwrap(), Some(entry));
        assert_eq!(cache.get_as::<Entry>("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_decode_failure_is_codec_error() {
        let cache = memory_cache();
        cache.set("short", vec![1]).await.unwrap();
        assert!(matches!(cache.get_as::<u64>("short").await, Err(StorageError::Codec(_))));
    }

    #[tokio::test]
    async fn test_opens_lazily() {
        let cache = memory_cache();
        assert!(!cache.is_open());
        cache.get("k").await.unwrap();
        assert!(cache.is_open());
    }

    /// Backend counting opens, to check first-use races share one open
    #[derive(Debug, Default)]
    struct CountingBackend {
        inner: MemoryBackend,
        opens: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl StorageBackend for CountingBackend {
        async fn open(
            &self,
            name: &str,
            version: u32,
            upgrade: UpgradeHandler<'_>,
        ) -> Result<Arc<dyn Connection>, StorageError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.inner.open(name, version, upgrade).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_opens_once() {
        let backend = CountingBackend::default();
        let opens = Arc::clone(&backend.opens);
        let cache = Arc::new(PersistentCache::new(CacheConfig::new("unused"), backend));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.set(&format!("key-{i}"), vec![i as u8]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("key-7").await.unwrap(), Some(vec![7]));
    }

    #[derive(Debug, Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl StorageBackend for FlakyBackend {
        async fn open(
            &self,
            name: &str,
            version: u32,
            upgrade: UpgradeHandler<'_>,
        ) -> Result<Arc<dyn Connection>, StorageError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(StorageError::unavailable(name, "storage disabled"));
            }
            self.inner.open(name, version, upgrade).await
        }
    }

    #[tokio::test]
    async fn test_failed_open_is_retried() {
        let cache = PersistentCache::new(CacheConfig::new("unused"), FlakyBackend::default());

        assert!(matches!(cache.get("k").await, Err(StorageError::Unavailable { .. })));
        assert!(!cache.is_open());
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_open());
    }

    #[tokio::test]
    async fn test_on_disk_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::new(dir.path());

        PersistentCache::on_disk(config.clone())
            .set("scene.gltf", b"{\"asset\":{}}".to_vec())
            .await
            .unwrap();

        let reopened = PersistentCache::on_disk(config);
        assert_eq!(
            reopened.get("scene.gltf").await.unwrap(),
            Some(b"{\"asset\":{}}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_request_failure_reaches_caller_unchanged() {
        use crate::cache::error::StorageOperation;

        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::on_disk(CacheConfig::new(dir.path()));
        cache.set("warm", vec![0]).await.unwrap();
        std::fs::create_dir_all(dir.path().join("three-viewer-cache").join("files").join("k61.rec")).unwrap();

        assert!(matches!(
            cache.get("a").await,
            Err(StorageError::Transaction { operation: StorageOperation::Get, .. })
        ));
        assert!(matches!(
            cache.set("a", vec![1]).await,
            Err(StorageError::Transaction { operation: StorageOperation::Put, .. })
        ));
        assert!(matches!(
            cache.delete("a").await,
            Err(StorageError::Transaction { operation: StorageOperation::Delete, .. })
        ));
        assert_eq!(cache.get("warm").await.unwrap(), Some(vec![0]));
    }

    #[tokio::test]
    async fn test_store_created_once_across_opens() {
        let backend = MemoryBackend::new();
        let config = CacheConfig::new("unused");

        let first = PersistentCache::new(config.clone(), backend.clone());
        first.set("k", vec![1]).await.unwrap();
        let second = PersistentCache::new(config, backend);
        assert_eq!(second.get("k").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_version_bump_keeps_records() {
        let backend = MemoryBackend::new();
        let v1 = PersistentCache::new(CacheConfig::new("unused"), backend.clone());
        v1.set("k", vec![1]).await.unwrap();

        let v2 = PersistentCache::new(CacheConfig::new("unused").with_version(2), backend);
        assert_eq!(v2.get("k").await.unwrap(), Some(vec![1]));
    }
}
