//! Error types for JsonDB core.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in JsonDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] jsondb_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The lock on a collection could not be acquired in time.
    ///
    /// This is transient contention, not a data error. Callers may retry.
    #[error("timed out after {waited:?} waiting for lock on {}", .path.display())]
    LockTimeout {
        /// The file whose lock was contended.
        path: PathBuf,
        /// How long the caller waited.
        waited: Duration,
    },

    /// A lock guard tried to renew a lease that was broken and taken over.
    #[error("lease on {} was lost", .path.display())]
    LeaseLost {
        /// The file whose lock was lost.
        path: PathBuf,
    },

    /// An item handed to `save_item` lacks its identifier field.
    #[error("item is missing identifier field `{field}`")]
    MissingIdField {
        /// Name of the identifier field.
        field: String,
    },

    /// An item is not shaped the way item-level operations require.
    #[error("invalid item: {message}")]
    InvalidItem {
        /// Description of the problem.
        message: String,
    },

    /// A file, backup, or archive name would escape its directory.
    #[error("invalid name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A full backup with this name already exists.
    #[error("archive already exists: {name}")]
    ArchiveExists {
        /// Name of the archive.
        name: String,
    },

    /// A collection file is not valid JSON and was quarantined.
    #[error("corrupted collection {} (moved to {})", .path.display(), .quarantined_to.display())]
    Corrupted {
        /// The original location of the file.
        path: PathBuf,
        /// Where the bytes were moved.
        quarantined_to: PathBuf,
    },
}

impl CoreError {
    /// Creates a lock timeout error.
    pub fn lock_timeout(path: impl Into<PathBuf>, waited: Duration) -> Self {
        Self::LockTimeout {
            path: path.into(),
            waited,
        }
    }

    /// Creates a missing identifier error.
    pub fn missing_id_field(field: impl Into<String>) -> Self {
        Self::MissingIdField {
            field: field.into(),
        }
    }

    /// Creates an invalid item error.
    pub fn invalid_item(message: impl Into<String>) -> Self {
        Self::InvalidItem {
            message: message.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates an archive exists error.
    pub fn archive_exists(name: impl Into<String>) -> Self {
        Self::ArchiveExists { name: name.into() }
    }

    /// Returns true for transient failures worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Returns true if this error is a "not found" from the filesystem.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }
}
