//! Durable directory-backed storage backend
//!
//! Layout under the backend root:
//!
//! ```text
//! <root>/<database>/manifest.ron        name, version, store list
//! <root>/<database>/<store>/k<hex>.rec  one file per record
//! ```
//!
//! Keys are hex-encoded so any string is a valid key. Long encodings are split
//! into nested directories to stay under file name limits. Writes go to a
//! temporary file that is synced and renamed into place, so a record is either
//! the old value or the new one. All filesystem work runs on the blocking pool.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::backend::{plan_open, Connection, StorageBackend, UpgradeHandler, UpgradeTransaction};
use super::error::{StorageError, StorageOperation};
use super::request::Request;
use super::transaction::{StoreTransaction, TransactionMode};

const MANIFEST_FILE: &str = "manifest.ron";
const RECORD_EXTENSION: &str = "rec";
/// Hex characters per path component of an encoded key
const KEY_SEGMENT_LEN: usize = 128;

/// Persisted database schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    name: String,
    version: u32,
    stores: Vec<String>,
}

/// Storage backend persisting databases as directories on disk
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    locks: Arc<LockRegistry>,
}

/// Per-store transaction locks plus the lock serializing opens
///
/// Shared by every backend in the process rooted at the same directory.
#[derive(Debug, Default)]
struct LockRegistry {
    open: tokio::sync::Mutex<()>,
    stores: Mutex<HashMap<PathBuf, Arc<RwLock<PathBuf>>>>,
}

static REGISTRIES: OnceLock<Mutex<HashMap<PathBuf, Arc<LockRegistry>>>> = OnceLock::new();

impl LockRegistry {
    fn for_root(root: &Path) -> Arc<Self> {
        let mut registries = REGISTRIES
            .get_or_init(Mutex::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(registries.entry(root.to_path_buf()).or_default())
    }

    fn store_lock(&self, store_dir: &Path) -> Arc<RwLock<PathBuf>> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            stores
                .entry(store_dir.to_path_buf())
                .or_insert_with(|| Arc::new(RwLock::new(store_dir.to_path_buf()))),
        )
    }
}

impl FileBackend {
    /// Create a backend rooted at `root`; nothing is touched until a database is opened
    ///
    /// Backends created on the same root share opens and store locks.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root: PathBuf = root.components().collect();
        let locks = LockRegistry::for_root(&root);
        Self { root, locks }
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHandler<'_>,
    ) -> Result<Arc<dyn Connection>, StorageError> {
        validate_name(name).map_err(|reason| StorageError::unavailable(name, reason))?;
        let _open_guard = self.locks.open.lock().await;

        let database_dir = self.root.join(name);
        let manifest = {
            let database_dir = database_dir.clone();
            let database = name.to_string();
            Request::spawn_blocking(move || read_manifest(&database, &database_dir)).await?
        };
        let existing = manifest.as_ref().map_or(0, |m| m.version);

        let manifest = match plan_open(name, version, existing)? {
            None => manifest.unwrap_or_else(|| Manifest {
                name: name.to_string(),
                version,
                stores: Vec::new(),
            }),
            Some(old_version) => {
                let current_stores = manifest.map(|m| m.stores).unwrap_or_default();
                let mut staged = UpgradeTransaction::new(name, old_version, version, current_stores);
                upgrade(&mut staged)?;

                let next = Manifest {
                    name: name.to_string(),
                    version,
                    stores: staged.store_names(),
                };
                let created = staged.created_stores().to_vec();
                let database_dir = database_dir.clone();
                let to_write = next.clone();
                Request::spawn_blocking(move || commit_upgrade(&database_dir, &to_write, &created)).await?;
                log::debug!("Upgraded database '{}' from v{} to v{}", name, old_version, version);
                next
            }
        };

        Ok(Arc::new(FileConnection {
            name: manifest.name,
            version: manifest.version,
            stores: manifest.stores,
            database_dir,
            locks: Arc::clone(&self.locks),
        }))
    }
}

/// Connection to an on-disk database
#[derive(Debug)]
struct FileConnection {
    name: String,
    version: u32,
    stores: Vec<String>,
    database_dir: PathBuf,
    locks: Arc<LockRegistry>,
}

impl FileConnection {
    async fn begin(&self, store: &str, mode: TransactionMode) -> Result<StoreTransaction<PathBuf>, StorageError> {
        if !self.stores.iter().any(|s| s == store) {
            return Err(StorageError::StoreNotFound(store.to_string()));
        }
        let lock = self.locks.store_lock(&self.database_dir.join(store));
        Ok(StoreTransaction::begin(store, lock, mode).await)
    }
}

#[async_trait]
impl Connection for FileConnection {
    fn database_name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn store_names(&self) -> Vec<String> {
        self.stores.clone()
    }

    async fn get(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let tx = self.begin(store, TransactionMode::ReadOnly).await?;
        let key = key.to_string();
        Request::spawn_blocking(move || {
            let path = record_path(tx.state(), &key);
            match fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(StorageError::transaction(tx.store(), StorageOperation::Get, err)),
            }
        })
        .await
    }

    async fn put(&self, store: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut tx = self.begin(store, TransactionMode::ReadWrite).await?;
        let key = key.to_string();
        Request::spawn_blocking(move || {
            let store_dir = tx.state_mut()?.clone();
            write_record(&store_dir, &record_path(&store_dir, &key), &value)
                .map_err(|err| StorageError::transaction(tx.store(), StorageOperation::Put, err))
        })
        .await
    }

    async fn delete(&self, store: &str, key: &str) -> Result<(), StorageError> {
        let mut tx = self.begin(store, TransactionMode::ReadWrite).await?;
        let key = key.to_string();
        Request::spawn_blocking(move || {
            let store_dir = tx.state_mut()?.clone();
            remove_record(&store_dir, &record_path(&store_dir, &key))
                .map_err(|err| StorageError::transaction(tx.store(), StorageOperation::Delete, err))
        })
        .await
    }
}

/// Database and store names become directory names
fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("invalid name '{name}'"));
    }
    if name.chars().any(|c| matches!(c, '/' | '\\' | ':' | '\0')) {
        return Err(format!("name '{name}' contains a path separator"));
    }
    Ok(())
}

fn read_manifest(database: &str, database_dir: &Path) -> Result<Option<Manifest>, StorageError> {
    let path = database_dir.join(MANIFEST_FILE);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::unavailable(database, err)),
    };
    let manifest: Manifest = ron::from_str(&contents)
        .map_err(|err| StorageError::unavailable(database, format!("corrupt manifest: {err}")))?;
    Ok(Some(manifest))
}

fn commit_upgrade(database_dir: &Path, manifest: &Manifest, created: &[String]) -> Result<(), StorageError> {
    let unavailable = |reason: String| StorageError::unavailable(manifest.name.as_str(), reason);

    for store in created {
        validate_name(store).map_err(unavailable)?;
        fs::create_dir_all(database_dir.join(store)).map_err(|err| unavailable(err.to_string()))?;
    }
    let contents = ron::ser::to_string_pretty(manifest, ron::ser::PrettyConfig::default())
        .map_err(|err| unavailable(err.to_string()))?;
    write_record(database_dir, &database_dir.join(MANIFEST_FILE), contents.as_bytes())
        .map_err(|err| unavailable(err.to_string()))
}

/// Map a key to its record file inside `store_dir`
fn record_path(store_dir: &Path, key: &str) -> PathBuf {
    let mut encoded = String::with_capacity(1 + key.len() * 2);
    encoded.push('k');
    for byte in key.bytes() {
        let _ = write!(encoded, "{byte:02x}");
    }

    let mut path = store_dir.to_path_buf();
    let mut rest = encoded.as_str();
    while rest.len() > KEY_SEGMENT_LEN {
        let (segment, tail) = rest.split_at(KEY_SEGMENT_LEN);
        path.push(segment);
        rest = tail;
    }
    path.push(format!("{rest}.{RECORD_EXTENSION}"));
    path
}

/// Write `bytes` to `path` atomically: temp file, sync, rename, sync directory
fn write_record(store_dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(store_dir);
    fs::create_dir_all(parent)?;

    let temp_path = parent.join(format!(".tmp-{}", uuid::Uuid::new_v4().simple()));
    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        sync_dir(parent)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn remove_record(store_dir: &Path, path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    }

    // Prune directories left empty by long keys
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == store_dir || fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    sync_dir(path.parent().unwrap_or(store_dir)).or_else(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            Ok(())
        } else {
            Err(err)
        }
    })
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
