//! Daybook Core Library
//!
//! This crate provides the persistence core for Daybook, a local-first
//! daily journal: one document per calendar day, with AI and speech history
//! attached to it.
//!
//! # Architecture
//!
//! - **SQLite**: source of truth for entries, history, and settings, with a
//!   versioned migration ledger and an FTS5 search index
//! - **Blob tree**: synthesized audio next to the database, referenced by
//!   relative path
//! - **Edit session**: in-memory working copy with debounced, coalesced
//!   autosave
//!
//! # Quick Start
//!
//! ```text
//! let store = StoreHandle::new(Store::open()?);
//! let session = EditSession::open(
//!     Arc::new(store.clone()),
//!     EntryDate::today(),
//!     config.autosave_debounce(),
//! ).await?;
//!
//! session.edit(r#"{"type":"doc","content":[]}"#);
//! // ...two quiet seconds later the entry is saved
//! session.close().await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `autosave`: Edit session and autosave scheduler
//! - `backup`: Snapshot export and import
//! - `assist`: AI and speech helpers bound to a session
//! - `models`: Entries and their history records
//! - `date_key`: Calendar-day keys
//! - `content`: Plain-text extraction and search queries
//! - `providers`: AI and TTS collaborator interfaces
//! - `storage`: SQLite schema, queries, and blob files
//! - `config`: Application configuration

pub mod assist;
pub mod autosave;
pub mod backup;
pub mod config;
pub mod content;
pub mod date_key;
pub mod models;
pub mod providers;
pub mod storage;
pub mod store;

pub use autosave::{EditSession, EntryRepository, FlushOutcome, SaveStatus, SessionError};
pub use backup::{ImportOptions, ImportReport, Snapshot};
pub use config::Config;
pub use date_key::{EntryDate, Month};
pub use models::{AiOpKind, AiOperation, AudioRecord, Entry, NewAiOperation, WritingStats};
pub use providers::{AiProvider, ProviderError, TtsProvider};
pub use storage::{CascadePolicy, StorageError, StorageResult};
pub use store::{DeleteReport, Store, StoreHandle};
