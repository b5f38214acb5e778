//! Storage layer
//!
//! One SQLite database file plus a sibling directory tree of audio blobs.
//!
//! ## Architecture
//!
//! - **SQLite**: entries, append-only history, migration ledger, search index
//! - **Blob tree**: synthesized audio, addressed by paths relative to the
//!   data directory so snapshots stay portable
//!
//! Deletion of an entry resolves its history through one central
//! [`CascadePolicy`]; see `cascade`.

pub mod blobs;
pub mod cascade;
pub mod database;
pub mod error;
pub mod history;
pub mod schema;

use chrono::{DateTime, Utc};

pub use blobs::{BlobStore, ReclaimReport};
pub use cascade::{CascadeOutcome, CascadePolicy};
pub use database::Database;
pub use error::{MigrationError, StorageError, StorageResult};
pub use schema::{migrate, SchemaVersion, SCHEMA_VERSION};

/// Timestamps are stored as Unix milliseconds
pub(crate) fn to_millis(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}
