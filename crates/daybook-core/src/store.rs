//! Unified storage interface
//!
//! The `Store` owns the SQLite database and the audio blob tree and keeps
//! the two consistent:
//! - entry writes go straight to SQLite
//! - audio blobs are written before their metadata row, and removed again
//!   if the row cannot be inserted
//! - deleting an entry resolves its history through the configured
//!   [`CascadePolicy`], then removes orphaned blobs best-effort
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let today = EntryDate::today();
//! store.upsert(&today, r#"{"type":"doc","content":[]}"#)?;
//!
//! let entries = store.list_by_month(&today.month())?;
//! ```
//!
//! Async callers (the autosave scheduler) go through [`StoreHandle`], which
//! runs each call on tokio's blocking pool.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::autosave::EntryRepository;
use crate::config::Config;
use crate::date_key::{EntryDate, Month};
use crate::models::{AiOperation, AudioRecord, Entry, NewAiOperation, WritingStats};
use crate::providers::SynthesizedAudio;
use crate::storage::{
    BlobStore, CascadeOutcome, CascadePolicy, Database, ReclaimReport, StorageError,
    StorageResult,
};

/// What a delete did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Whether an entry existed for the date
    pub deleted: bool,
    pub policy: CascadePolicy,
    /// AI operations removed or orphaned
    pub ai_operations: usize,
    /// Audio records removed or orphaned
    pub audio_records: usize,
    /// Blob cleanup; failures here never undo the delete
    pub reclaim: ReclaimReport,
}

/// Unified storage interface for Daybook
pub struct Store {
    db: Database,
    blobs: BlobStore,
    config: Config,
}

impl Store {
    /// Open the store from the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).context("Failed to open store")
    }

    /// Open the store with a specific configuration
    ///
    /// Applies pending migrations and retries any blob removals left over
    /// from earlier deletes.
    pub fn open_with_config(config: Config) -> StorageResult<Self> {
        let db = Database::open(&config.database_path())?;
        let store = Self {
            db,
            blobs: BlobStore::new(&config.data_dir),
            config,
        };

        let report = store.reclaim_blobs()?;
        if !report.removed.is_empty() || !report.failed.is_empty() {
            info!(
                "Reclaimed {} audio blobs at startup ({} still pending)",
                report.removed.len(),
                report.failed.len()
            );
        }

        Ok(store)
    }

    /// In-memory database with blobs under `data_dir` (for testing)
    pub fn open_in_memory(data_dir: &Path) -> StorageResult<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
            blobs: BlobStore::new(data_dir),
            config: Config::with_data_dir(data_dir),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn schema_version(&self) -> StorageResult<i64> {
        self.db.schema_version()
    }

    // ==================== Entry Operations ====================

    /// Create or replace the entry for a date
    pub fn upsert(&mut self, date: &EntryDate, content: &str) -> StorageResult<Entry> {
        self.db.upsert_entry(date, content)
    }

    /// Get the entry for a date
    pub fn get(&self, date: &EntryDate) -> StorageResult<Option<Entry>> {
        self.db.get_entry(date)
    }

    /// Get an entry by id
    pub fn get_by_id(&self, id: &Uuid) -> StorageResult<Option<Entry>> {
        self.db.get_entry_by_id(id)
    }

    /// Entries in a month, newest first
    pub fn list_by_month(&self, month: &Month) -> StorageResult<Vec<Entry>> {
        self.db.list_entries(month)
    }

    /// Entries in a month with a given mood, newest first
    pub fn list_by_mood(&self, month: &Month, mood: &str) -> StorageResult<Vec<Entry>> {
        self.db.list_entries_by_mood(month, mood)
    }

    /// Set or clear the mood for a date
    pub fn set_mood(
        &mut self,
        date: &EntryDate,
        mood: Option<&str>,
        mood_emoji: Option<&str>,
    ) -> StorageResult<Entry> {
        self.db.set_mood(date, mood, mood_emoji)
    }

    /// Full-text search, most relevant first
    pub fn search(&self, query: &str) -> StorageResult<Vec<Entry>> {
        self.db.search_entries(query)
    }

    /// Delete the entry for a date using the configured cascade policy
    ///
    /// Returns `false` if there was no entry.
    pub fn delete(&mut self, date: &EntryDate) -> StorageResult<bool> {
        Ok(self.delete_with_report(date)?.deleted)
    }

    /// Delete the entry for a date and report what happened to its history
    pub fn delete_with_report(&mut self, date: &EntryDate) -> StorageResult<DeleteReport> {
        self.delete_with_policy(date, self.config.cascade_policy)
    }

    /// Delete the entry for a date with an explicit cascade policy
    pub fn delete_with_policy(
        &mut self,
        date: &EntryDate,
        policy: CascadePolicy,
    ) -> StorageResult<DeleteReport> {
        let Some(CascadeOutcome {
            ai_operations,
            audio_records,
            queued_blobs,
        }) = self.db.delete_entry(date, policy)?
        else {
            return Ok(DeleteReport {
                policy,
                ..DeleteReport::default()
            });
        };

        let reclaim = self.reclaim_paths(&queued_blobs)?;

        Ok(DeleteReport {
            deleted: true,
            policy,
            ai_operations,
            audio_records,
            reclaim,
        })
    }

    /// Get entry count
    pub fn entry_count(&self) -> StorageResult<i64> {
        self.db.entry_count()
    }

    /// Writing statistics as of today (local date)
    pub fn stats(&self) -> StorageResult<WritingStats> {
        let dates = self.db.entry_dates()?;
        Ok(WritingStats::from_dates(&dates, Local::now().date_naive()))
    }

    // ==================== History Operations ====================

    /// Record an AI operation against an existing entry
    pub fn add_ai_operation(
        &self,
        entry_id: Uuid,
        op: NewAiOperation,
    ) -> StorageResult<AiOperation> {
        let record = op.into_record(entry_id);
        self.db.insert_ai_operation(&record)?;
        debug!("Recorded {} operation for entry {}", record.kind, entry_id);
        Ok(record)
    }

    /// Store synthesized audio for an existing entry
    ///
    /// The blob is written first; if the metadata row can't be inserted the
    /// blob is removed again.
    pub fn add_audio_record(
        &self,
        entry_id: Uuid,
        text: &str,
        audio: &SynthesizedAudio,
        voice: Option<&str>,
        speed: Option<f32>,
    ) -> StorageResult<AudioRecord> {
        let entry = self
            .db
            .get_entry_by_id(&entry_id)?
            .ok_or_else(|| StorageError::NotFound(format!("entry id {}", entry_id)))?;

        let relpath = BlobStore::new_relpath(&entry.entry_date, &audio.format);
        self.blobs.write(&relpath, &audio.bytes)?;

        let record = AudioRecord {
            id: Uuid::new_v4(),
            entry_id: Some(entry_id),
            orphaned_from: None,
            text: text.to_string(),
            audio_relpath: relpath,
            voice: voice.map(str::to_string),
            speed,
            created_at: Utc::now(),
        };

        if let Err(e) = self.db.insert_audio_record(&record) {
            if let Err(cleanup) = self.blobs.remove(&record.audio_relpath) {
                warn!(
                    "Failed to remove orphaned blob {}: {}",
                    record.audio_relpath, cleanup
                );
            }
            return Err(e);
        }

        debug!(
            "Stored {} bytes of audio for entry {} at {}",
            audio.bytes.len(),
            entry_id,
            record.audio_relpath
        );
        Ok(record)
    }

    /// AI operations for an entry, newest first
    pub fn list_ai_operations(&self, entry_id: &Uuid) -> StorageResult<Vec<AiOperation>> {
        self.db.list_ai_operations(entry_id)
    }

    /// Audio records for an entry, newest first
    pub fn list_audio_records(&self, entry_id: &Uuid) -> StorageResult<Vec<AudioRecord>> {
        self.db.list_audio_records(entry_id)
    }

    /// Every AI operation including orphans
    pub fn all_ai_operations(&self) -> StorageResult<Vec<AiOperation>> {
        self.db.all_ai_operations()
    }

    /// Every audio record including orphans
    pub fn all_audio_records(&self) -> StorageResult<Vec<AudioRecord>> {
        self.db.all_audio_records()
    }

    // ==================== Blob Reclamation ====================

    /// Retry removal of every queued blob
    pub fn reclaim_blobs(&self) -> StorageResult<ReclaimReport> {
        let pending = self.db.pending_reclaims()?;
        self.reclaim_paths(&pending)
    }

    fn reclaim_paths(&self, relpaths: &[String]) -> StorageResult<ReclaimReport> {
        let mut report = ReclaimReport::default();

        for relpath in relpaths {
            // A later import may have re-attached the same file.
            if self.db.audio_relpath_in_use(relpath)? {
                self.db.clear_reclaim(relpath)?;
                continue;
            }

            match self.blobs.remove(relpath) {
                Ok(_) => {
                    self.db.clear_reclaim(relpath)?;
                    report.removed.push(relpath.clone());
                }
                Err(e) => {
                    warn!("Could not remove audio blob {}: {}", relpath, e);
                    report.failed.push((relpath.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    // ==================== Settings ====================

    pub fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        self.db.get_setting(key)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        self.db.set_setting(key, value)
    }
}

/// Shareable async front for a [`Store`]
///
/// Every call runs on the blocking pool so SQLite never stalls the runtime.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<Store>>,
}

impl StoreHandle {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` against the store on the blocking pool
    pub async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Store) -> StorageResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut store = inner.blocking_lock();
            f(&mut store)
        })
        .await
        .map_err(|e| StorageError::Background(e.to_string()))?
    }
}

#[async_trait]
impl EntryRepository for StoreHandle {
    async fn save_entry(&self, date: &EntryDate, content: &str) -> StorageResult<Entry> {
        let date = date.clone();
        let content = content.to_string();
        self.run(move |store| store.upsert(&date, &content)).await
    }

    async fn load_entry(&self, date: &EntryDate) -> StorageResult<Option<Entry>> {
        let date = date.clone();
        self.run(move |store| store.get(&date)).await
    }
}
