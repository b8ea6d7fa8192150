//! Storage substrate contract
//!
//! A [`StorageBackend`] opens named, versioned databases. Opening at a newer
//! version than the one stored runs an upgrade step, the only point at which
//! record stores may be created. The resulting [`Connection`] exposes
//! single-request get/put/delete operations, each running in its own
//! transaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::StorageError;

/// Callback run while a database is being upgraded
pub type UpgradeHandler<'a> = &'a (dyn Fn(&mut UpgradeTransaction) -> Result<(), StorageError> + Send + Sync);

/// Schema changes staged during a version upgrade
///
/// Nothing is applied unless the upgrade handler returns `Ok`.
#[derive(Debug, Clone)]
pub struct UpgradeTransaction {
    database: String,
    old_version: u32,
    new_version: u32,
    stores: BTreeSet<String>,
    created: Vec<String>,
}

impl UpgradeTransaction {
    /// Stage an upgrade of `database` from `old_version` (0 if it did not exist)
    pub fn new(
        database: impl Into<String>,
        old_version: u32,
        new_version: u32,
        existing_stores: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            database: database.into(),
            old_version,
            new_version,
            stores: existing_stores.into_iter().collect(),
            created: Vec::new(),
        }
    }

    /// Version before the upgrade, 0 for a database created by this open
    pub fn old_version(&self) -> u32 {
        self.old_version
    }

    /// Version after the upgrade
    pub fn new_version(&self) -> u32 {
        self.new_version
    }

    /// Whether a store exists, including stores created earlier in this upgrade
    pub fn contains_store(&self, name: &str) -> bool {
        self.stores.contains(name)
    }

    /// Create a record store; fails if one with that name already exists
    pub fn create_store(&mut self, name: &str) -> Result<(), StorageError> {
        if !self.stores.insert(name.to_string()) {
            return Err(StorageError::StoreExists(name.to_string()));
        }
        log::debug!("Creating record store '{}' in database '{}'", name, self.database);
        self.created.push(name.to_string());
        Ok(())
    }

    /// Stores created during this upgrade, in creation order
    pub fn created_stores(&self) -> &[String] {
        &self.created
    }

    /// All stores the database will contain after the upgrade
    pub fn store_names(&self) -> Vec<String> {
        self.stores.iter().cloned().collect()
    }
}

/// Resolve the version an open request lands on, or reject a downgrade
///
/// Returns `Some(old_version)` when an upgrade must run.
pub fn plan_open(database: &str, requested: u32, existing: u32) -> Result<Option<u32>, StorageError> {
    if requested == 0 {
        return Err(StorageError::unavailable(database, "database version must be at least 1"));
    }
    match requested.cmp(&existing) {
        std::cmp::Ordering::Less => Err(StorageError::VersionMismatch {
            database: database.to_string(),
            requested,
            existing,
        }),
        std::cmp::Ordering::Equal => Ok(None),
        std::cmp::Ordering::Greater => Ok(Some(existing)),
    }
}

/// An open database
#[async_trait]
pub trait Connection: Send + Sync + std::fmt::Debug {
    /// Name of the database
    fn database_name(&self) -> &str;

    /// Schema version the connection was opened at
    fn version(&self) -> u32;

    /// Record stores present in the database
    fn store_names(&self) -> Vec<String>;

    /// Read one record; `Ok(None)` when the key is absent
    async fn get(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or overwrite one record, returning once the write is committed
    async fn put(&self, store: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Remove one record; succeeds when the key is absent
    async fn delete(&self, store: &str, key: &str) -> Result<(), StorageError>;
}

/// A persistent substrate that can open databases
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Open `name` at `version`, creating it if missing
    ///
    /// `upgrade` runs when the stored version is older than `version`
    /// (including when the database does not exist yet).
    async fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHandler<'_>,
    ) -> Result<Arc<dyn Connection>, StorageError>;
}
