//! Storage error taxonomy

use thiserror::Error;

/// Operation a failed transaction was performing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    /// Read of a single key
    Get,
    /// Insert or overwrite of a single key
    Put,
    /// Removal of a single key
    Delete,
}

impl std::fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the persistent cache and its storage backends
///
/// Errors are passed to the caller unchanged. A missing key is not an error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened at all
    #[error("Storage unavailable for database '{database}': {reason}")]
    Unavailable {
        /// Database name
        database: String,
        /// Substrate-provided reason
        reason: String,
    },

    /// A request failed after the database was opened
    #[error("Transaction {operation} on store '{store}' failed: {source}")]
    Transaction {
        /// Store the transaction was scoped to
        store: String,
        /// Request that failed
        operation: StorageOperation,
        /// Native substrate error
        #[source]
        source: std::io::Error,
    },

    /// Opened with a version older than the one on disk
    #[error("Database '{database}' is at version {existing}, cannot open at version {requested}")]
    VersionMismatch {
        /// Database name
        database: String,
        /// Version passed to open
        requested: u32,
        /// Version already stored
        existing: u32,
    },

    /// Store creation attempted for a store that already exists
    #[error("Record store already exists: {0}")]
    StoreExists(String),

    /// Request addressed a store the database does not contain
    #[error("Record store not found: {0}")]
    StoreNotFound(String),

    /// Write attempted inside a read-only transaction
    #[error("Read-only transaction on store '{0}' cannot write")]
    ReadOnlyTransaction(String),

    /// Typed value could not be encoded or decoded
    #[error("Value codec error: {0}")]
    Codec(String),

    /// The substrate dropped a request without resolving it
    #[error("Storage request aborted before completion")]
    RequestAborted,
}

impl StorageError {
    /// Build a [`StorageError::Unavailable`] from any displayable cause
    pub fn unavailable(database: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            database: database.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`StorageError::Transaction`] wrapping a native IO failure
    pub fn transaction(store: impl Into<String>, operation: StorageOperation, source: std::io::Error) -> Self {
        Self::Transaction {
            store: store.into(),
            operation,
            source,
        }
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_error_message() {
        let err = StorageError::transaction(
            "files",
            StorageOperation::Put,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only filesystem"),
        );
        assert_eq!(
            err.to_string(),
            "Transaction put on store 'files' failed: read-only filesystem"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unavailable_message() {
        let err = StorageError::unavailable("three-viewer-cache", "permission denied");
        assert!(err.to_string().contains("three-viewer-cache"));
        assert!(err.to_string().contains("permission denied"));
    }
}
