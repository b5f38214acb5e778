//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Malformed date key, month, or blob path
    #[error("Invalid {kind} '{value}': expected {expected}")]
    Validation {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Uniqueness constraint violated (indicates a store bug)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation on an entry that does not exist
    #[error("No entry for {0}")]
    NotFound(String),

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema migration failed or the schema is unknown
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// Snapshot or content (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled
    #[error("Background storage task failed: {0}")]
    Background(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while bringing the schema up to date
///
/// Always fatal: the store refuses to open on any of these.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The database was written by a newer build
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnknownVersion { found: i64, supported: i64 },

    /// A migration step failed and was rolled back
    #[error("Migration {version} ({name}) failed: {source}")]
    Failed {
        version: i64,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// The migration ledger could not be read or written
    #[error("Migration ledger unavailable: {0}")]
    Ledger(#[source] rusqlite::Error),
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Shorthand for a validation failure
    pub fn invalid(kind: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        StorageError::Validation {
            kind,
            value: value.into(),
            expected,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors are worth retrying once the user has acted
    /// (freed space, fixed permissions). Migration errors never are.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::WriteError { .. }
                | StorageError::Database(rusqlite::Error::SqliteFailure(_, _))
        )
    }

    /// Check if this error means the requested entry is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Migration(MigrationError::UnknownVersion { .. }) => {
                Some("This database was created by a newer version. Upgrade before opening it.")
            }
            StorageError::Conflict(_) => {
                Some("The store found two records for one key. Export your data and report the issue.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_validation_display() {
        let err = StorageError::invalid("entry date", "2026-13-01", "YYYY-MM-DD");
        let msg = err.to_string();
        assert!(msg.contains("2026-13-01"));
        assert!(msg.contains("YYYY-MM-DD"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_migration_errors_are_fatal() {
        let err: StorageError = MigrationError::UnknownVersion {
            found: 9,
            supported: 6,
        }
        .into();

        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("newer"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_not_found() {
        let err = StorageError::NotFound("2026-01-01".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No entry for 2026-01-01");
    }
}
