//! Snapshot export and import
//!
//! A snapshot is a single JSON document holding every entry and, optionally,
//! the history attached to them. Import works record by record: each record
//! commits on its own, and a bad record is reported without stopping the
//! rest.

use std::collections::HashMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::date_key::EntryDate;
use crate::models::{AiOperation, AudioRecord, Entry};
use crate::storage::database::ImportedEntry;
use crate::storage::{StorageError, StorageResult};
use crate::store::Store;

/// Snapshot layout version written by this build
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Everything needed to rebuild a daybook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub format_version: u32,
    /// Schema version of the exporting database, informational
    pub schema_version: i64,
    pub exported_at: DateTime<Utc>,
    /// Entries ordered by date
    pub entries: Vec<Entry>,
    /// Ordered by creation time, then id
    #[serde(default)]
    pub ai_operations: Vec<AiOperation>,
    #[serde(default)]
    pub audio_records: Vec<AudioRecord>,
}

impl Snapshot {
    /// Serialize as pretty-printed JSON
    pub fn write_json<W: Write>(&self, writer: W) -> StorageResult<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Parse a snapshot from JSON
    pub fn read_json<R: Read>(reader: R) -> StorageResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// How to treat incoming records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Replace local entries that share a date with an incoming one
    pub overwrite: bool,
    /// Also import AI operations and audio records
    pub include_history: bool,
}

/// A record that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// What the record was, e.g. `entry 2026-01-01`
    pub record: String,
    pub reason: String,
}

/// Result of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Entries inserted or overwritten
    pub imported: usize,
    /// Entries left alone because the date already existed
    pub skipped: usize,
    /// History records inserted
    pub history_imported: usize,
    pub failures: Vec<ImportFailure>,
    /// Imported audio records whose file is not under the blob root
    ///
    /// Snapshots carry metadata only; the clips have to be copied over
    /// separately for playback to work.
    pub missing_audio: Vec<String>,
}

impl ImportReport {
    fn fail(&mut self, record: String, reason: impl ToString) {
        let reason = reason.to_string();
        warn!("Import of {} failed: {}", record, reason);
        self.failures.push(ImportFailure { record, reason });
    }
}

impl Store {
    /// Capture every entry and all history
    pub fn export(&self) -> StorageResult<Snapshot> {
        Ok(Snapshot {
            format_version: SNAPSHOT_FORMAT,
            schema_version: self.schema_version()?,
            exported_at: Utc::now(),
            entries: self.database().all_entries()?,
            ai_operations: self.all_ai_operations()?,
            audio_records: self.all_audio_records()?,
        })
    }

    /// Restore a snapshot
    ///
    /// Snapshots from a newer format are rejected before anything is written.
    pub fn import(
        &mut self,
        snapshot: &Snapshot,
        options: ImportOptions,
    ) -> StorageResult<ImportReport> {
        if snapshot.format_version > SNAPSHOT_FORMAT {
            return Err(StorageError::invalid(
                "snapshot format",
                snapshot.format_version.to_string(),
                "format 1 or older",
            ));
        }

        let mut report = ImportReport::default();
        // Snapshot entry id -> local entry id for the same date
        let mut local_ids: HashMap<Uuid, Uuid> = HashMap::new();

        for entry in &snapshot.entries {
            match self.database_mut().import_entry(entry, options.overwrite) {
                Ok(outcome) => {
                    local_ids.insert(entry.id, outcome.local_id());
                    match outcome {
                        ImportedEntry::Inserted(_) | ImportedEntry::Overwritten(_) => {
                            report.imported += 1
                        }
                        ImportedEntry::Skipped(_) => report.skipped += 1,
                    }
                }
                Err(e) => report.fail(format!("entry {}", entry.entry_date), e),
            }
        }

        if options.include_history {
            for op in &snapshot.ai_operations {
                let label = format!("ai operation {}", op.id);
                let Some(op) = repoint(op, &local_ids, &mut report, &label) else {
                    continue;
                };
                match self.database().import_ai_operation(&op) {
                    Ok(true) => report.history_imported += 1,
                    Ok(false) => {}
                    Err(e) => report.fail(label, e),
                }
            }

            for record in &snapshot.audio_records {
                let label = format!("audio record {}", record.id);
                if let Err(e) = self.blobs().resolve(&record.audio_relpath) {
                    report.fail(label, e);
                    continue;
                }
                let Some(record) = repoint(record, &local_ids, &mut report, &label) else {
                    continue;
                };
                match self.database().import_audio_record(&record) {
                    Ok(true) => {
                        report.history_imported += 1;
                        if !self.blobs().exists(&record.audio_relpath) {
                            warn!(
                                "Imported {} without its file {}",
                                label, record.audio_relpath
                            );
                            report.missing_audio.push(record.audio_relpath.clone());
                        }
                    }
                    Ok(false) => {}
                    Err(e) => report.fail(label, e),
                }
            }
        }

        info!(
            "Imported {} entries ({} skipped, {} history records, {} failures, {} missing audio files)",
            report.imported,
            report.skipped,
            report.history_imported,
            report.failures.len(),
            report.missing_audio.len()
        );
        Ok(report)
    }
}

/// History records that belong to an entry
trait Owned: Clone {
    fn owner(&self) -> Option<Uuid>;
    fn orphaned_from(&self) -> Option<&EntryDate>;
    fn set_owner(&mut self, id: Uuid);
}

impl Owned for AiOperation {
    fn owner(&self) -> Option<Uuid> {
        self.entry_id
    }

    fn orphaned_from(&self) -> Option<&EntryDate> {
        self.orphaned_from.as_ref()
    }

    fn set_owner(&mut self, id: Uuid) {
        self.entry_id = Some(id);
    }
}

impl Owned for AudioRecord {
    fn owner(&self) -> Option<Uuid> {
        self.entry_id
    }

    fn orphaned_from(&self) -> Option<&EntryDate> {
        self.orphaned_from.as_ref()
    }

    fn set_owner(&mut self, id: Uuid) {
        self.entry_id = Some(id);
    }
}

/// Point a history record at the local entry for its date
///
/// Orphans stay orphans. Records whose owner isn't in the snapshot fail.
fn repoint<T: Owned>(
    record: &T,
    local_ids: &HashMap<Uuid, Uuid>,
    report: &mut ImportReport,
    label: &str,
) -> Option<T> {
    match record.owner() {
        None if record.orphaned_from().is_some() => Some(record.clone()),
        None => {
            report.fail(label.to_string(), "record has no owner and no orphan date");
            None
        }
        Some(id) => match local_ids.get(&id) {
            Some(local) => {
                let mut record = record.clone();
                record.set_owner(*local);
                Some(record)
            }
            None => {
                report.fail(
                    label.to_string(),
                    format!("owner {} is not in the snapshot", id),
                );
                None
            }
        },
    }
}
