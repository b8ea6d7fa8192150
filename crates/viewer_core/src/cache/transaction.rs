//! Store-scoped transactions
//!
//! Every cache operation runs in its own transaction over exactly one record
//! store. Read-only transactions on a store may overlap; a read-write
//! transaction excludes all others on that store until it finishes.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::error::StorageError;

/// Access a transaction is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    /// Shared access; requests may only read
    ReadOnly,
    /// Exclusive access; requests may read and write
    ReadWrite,
}

#[derive(Debug)]
enum Guard<S> {
    Shared(OwnedRwLockReadGuard<S>),
    Exclusive(OwnedRwLockWriteGuard<S>),
}

/// Transaction over the state `S` of a single record store
///
/// The store lock is held for the lifetime of the value, so dropping it
/// commits (backends apply writes before the transaction ends).
#[derive(Debug)]
pub struct StoreTransaction<S> {
    store: String,
    guard: Guard<S>,
}

impl<S> StoreTransaction<S> {
    /// Wait for access to `lock` in the requested mode
    pub async fn begin(store: impl Into<String>, lock: Arc<RwLock<S>>, mode: TransactionMode) -> Self {
        let guard = match mode {
            TransactionMode::ReadOnly => Guard::Shared(lock.read_owned().await),
            TransactionMode::ReadWrite => Guard::Exclusive(lock.write_owned().await),
        };
        Self {
            store: store.into(),
            guard,
        }
    }

    /// Name of the store this transaction is scoped to
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Read access to the store state
    pub fn state(&self) -> &S {
        match &self.guard {
            Guard::Shared(guard) => &**guard,
            Guard::Exclusive(guard) => &**guard,
        }
    }

    /// Write access to the store state; fails for read-only transactions
    pub fn state_mut(&mut self) -> Result<&mut S, StorageError> {
        match &mut self.guard {
            Guard::Exclusive(guard) => Ok(&mut **guard),
            Guard::Shared(_) => Err(StorageError::ReadOnlyTransaction(self.store.clone())),
        }
    }
}
