//! In-process storage backend
//!
//! Databases live as long as the backend (and its clones). Useful for tests
//! and for hosts that want the cache API without touching disk.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::{plan_open, Connection, StorageBackend, UpgradeHandler, UpgradeTransaction};
use super::error::StorageError;
use super::transaction::{StoreTransaction, TransactionMode};

type Records = HashMap<String, Vec<u8>>;

#[derive(Debug, Default)]
struct MemoryDatabase {
    version: u32,
    stores: BTreeMap<String, Arc<RwLock<Records>>>,
}

/// Storage backend keeping every database in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    databases: Arc<Mutex<HashMap<String, MemoryDatabase>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the databases opened so far
    pub fn database_names(&self) -> Vec<String> {
        let databases = self.databases.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = databases.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHandler<'_>,
    ) -> Result<Arc<dyn Connection>, StorageError> {
        let mut databases = self.databases.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = databases.get(name).map_or(0, |db| db.version);

        if let Some(old_version) = plan_open(name, version, existing)? {
            let current_stores = databases
                .get(name)
                .map(|db| db.stores.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            let mut staged = UpgradeTransaction::new(name, old_version, version, current_stores);
            upgrade(&mut staged)?;

            let database = databases.entry(name.to_string()).or_default();
            for store in staged.created_stores() {
                database.stores.insert(store.clone(), Arc::new(RwLock::new(Records::new())));
            }
            database.version = version;
            log::debug!("Upgraded in-memory database '{}' from v{} to v{}", name, old_version, version);
        }

        let stores = databases
            .get(name)
            .map(|db| db.stores.clone())
            .unwrap_or_default();

        Ok(Arc::new(MemoryConnection {
            name: name.to_string(),
            version,
            stores,
        }))
    }
}

/// Connection to an in-memory database
#[derive(Debug)]
struct MemoryConnection {
    name: String,
    version: u32,
    stores: BTreeMap<String, Arc<RwLock<Records>>>,
}

impl MemoryConnection {
    async fn begin(&self, store: &str, mode: TransactionMode) -> Result<StoreTransaction<Records>, StorageError> {
        let lock = self
            .stores
            .get(store)
            .cloned()
            .ok_or_else(|| StorageError::StoreNotFound(store.to_string()))?;
        Ok(StoreTransaction::begin(store, lock, mode).await)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn database_name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    async fn get(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let tx = self.begin(store, TransactionMode::ReadOnly).await?;
        Ok(tx.state().get(key).cloned())
    }

    async fn put(&self, store: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut tx = self.begin(store, TransactionMode::ReadWrite).await?;
        tx.state_mut()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> Result<(), StorageError> {
        let mut tx = self.begin(store, TransactionMode::ReadWrite).await?;
        tx.state_mut()?.remove(key);
        Ok(())
    }
}
