//! Append-only history attached to entries
//!
//! AI operations and audio records are inserted once and never updated,
//! except when the orphan cascade policy detaches them from a deleted entry.

use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::date_key::EntryDate;
use crate::models::{AiOpKind, AiOperation, AudioRecord};
use crate::storage::database::{parse_uuid, Database};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::{from_millis, to_millis};

const AI_COLUMNS: &str =
    "id, entry_id, orphaned_from, op_type, original_text, result_text, provider, model, created_at";

const AUDIO_COLUMNS: &str =
    "id, entry_id, orphaned_from, text, audio_relpath, voice, speed, created_at";

impl Database {
    // ==================== AI operations ====================

    /// Record an AI operation
    ///
    /// Fails with `NotFound` when the owning entry does not exist.
    pub fn insert_ai_operation(&self, op: &AiOperation) -> StorageResult<()> {
        self.write_ai_operation("INSERT", op)?;
        Ok(())
    }

    /// Restore an AI operation from a snapshot
    ///
    /// Returns `false` if a record with the same id already exists.
    pub fn import_ai_operation(&self, op: &AiOperation) -> StorageResult<bool> {
        Ok(self.write_ai_operation("INSERT OR IGNORE", op)? > 0)
    }

    fn write_ai_operation(&self, verb: &str, op: &AiOperation) -> StorageResult<usize> {
        self.require_owner(op.entry_id.as_ref())?;
        Ok(self.conn.execute(
            &format!("{verb} INTO ai_operations ({AI_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                op.id.to_string(),
                op.entry_id.map(|id| id.to_string()),
                op.orphaned_from.as_ref().map(EntryDate::as_str),
                op.kind.as_str(),
                op.original_text,
                op.result_text,
                op.provider,
                op.model,
                to_millis(&op.created_at),
            ],
        )?)
    }

    /// AI operations for an entry, newest first
    pub fn list_ai_operations(&self, entry_id: &Uuid) -> StorageResult<Vec<AiOperation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AI_COLUMNS} FROM ai_operations
             WHERE entry_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map(params![entry_id.to_string()], AiRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AiRow::into_operation).collect()
    }

    /// Every AI operation including orphans, oldest first
    pub fn all_ai_operations(&self) -> StorageResult<Vec<AiOperation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AI_COLUMNS} FROM ai_operations ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt
            .query_map([], AiRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AiRow::into_operation).collect()
    }

    // ==================== Audio records ====================

    /// Record metadata for a synthesized clip whose blob is already written
    pub fn insert_audio_record(&self, record: &AudioRecord) -> StorageResult<()> {
        self.write_audio_record("INSERT", record)?;
        Ok(())
    }

    /// Restore an audio record from a snapshot
    ///
    /// Returns `false` if a record with the same id already exists.
    pub fn import_audio_record(&self, record: &AudioRecord) -> StorageResult<bool> {
        Ok(self.write_audio_record("INSERT OR IGNORE", record)? > 0)
    }

    fn write_audio_record(&self, verb: &str, record: &AudioRecord) -> StorageResult<usize> {
        self.require_owner(record.entry_id.as_ref())?;
        Ok(self.conn.execute(
            &format!("{verb} INTO audio_records ({AUDIO_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                record.id.to_string(),
                record.entry_id.map(|id| id.to_string()),
                record.orphaned_from.as_ref().map(EntryDate::as_str),
                record.text,
                record.audio_relpath,
                record.voice,
                record.speed.map(f64::from),
                to_millis(&record.created_at),
            ],
        )?)
    }

    /// Audio records for an entry, newest first
    pub fn list_audio_records(&self, entry_id: &Uuid) -> StorageResult<Vec<AudioRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records
             WHERE entry_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map(params![entry_id.to_string()], AudioRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AudioRow::into_record).collect()
    }

    /// Every audio record including orphans, oldest first
    pub fn all_audio_records(&self) -> StorageResult<Vec<AudioRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt
            .query_map([], AudioRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AudioRow::into_record).collect()
    }

    /// Whether any audio record still points at a blob
    pub fn audio_relpath_in_use(&self, relpath: &str) -> StorageResult<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM audio_records WHERE audio_relpath = ?1 LIMIT 1",
                params![relpath],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    fn require_owner(&self, entry_id: Option<&Uuid>) -> StorageResult<()> {
        let Some(entry_id) = entry_id else {
            return Ok(());
        };
        if self.get_entry_by_id(entry_id)?.is_none() {
            return Err(StorageError::NotFound(format!("entry id {}", entry_id)));
        }
        Ok(())
    }
}

// ==================== Internal structs ====================

struct AiRow {
    id: String,
    entry_id: Option<String>,
    orphaned_from: Option<String>,
    op_type: String,
    original_text: String,
    result_text: String,
    provider: String,
    model: String,
    created_at: i64,
}

impl AiRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entry_id: row.get(1)?,
            orphaned_from: row.get(2)?,
            op_type: row.get(3)?,
            original_text: row.get(4)?,
            result_text: row.get(5)?,
            provider: row.get(6)?,
            model: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_operation(self) -> StorageResult<AiOperation> {
        Ok(AiOperation {
            id: parse_uuid(&self.id)?,
            entry_id: self.entry_id.as_deref().map(parse_uuid).transpose()?,
            orphaned_from: self
                .orphaned_from
                .as_deref()
                .map(EntryDate::parse)
                .transpose()?,
            kind: AiOpKind::from(self.op_type),
            original_text: self.original_text,
            result_text: self.result_text,
            provider: self.provider,
            model: self.model,
            created_at: from_millis(self.created_at),
        })
    }
}

struct AudioRow {
    id: String,
    entry_id: Option<String>,
    orphaned_from: Option<String>,
    text: String,
    audio_relpath: String,
    voice: Option<String>,
    speed: Option<f64>,
    created_at: i64,
}

impl AudioRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entry_id: row.get(1)?,
            orphaned_from: row.get(2)?,
            text: row.get(3)?,
            audio_relpath: row.get(4)?,
            voice: row.get(5)?,
            speed: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_record(self) -> StorageResult<AudioRecord> {
        Ok(AudioRecord {
            id: parse_uuid(&self.id)?,
            entry_id: self.entry_id.as_deref().map(parse_uuid).transpose()?,
            orphaned_from: self
                .orphaned_from
                .as_deref()
                .map(EntryDate::parse)
                .transpose()?,
            text: self.text,
            audio_relpath: self.audio_relpath,
            voice: self.voice,
            speed: self.speed.map(|s| s as f32),
            created_at: from_millis(self.created_at),
        })
    }
}
