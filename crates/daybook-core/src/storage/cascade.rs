//! Cascade policy for entry deletion
//!
//! Every deletion of an entry resolves its AI operations and audio records
//! through [`delete_cascading`], so the policy is applied in exactly one place.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Transaction};
use serde::{Deserialize, Serialize};

use crate::date_key::EntryDate;
use crate::storage::error::StorageResult;

/// What happens to an entry's history when the entry is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadePolicy {
    /// Remove the history with the entry; audio blobs are reclaimed
    #[default]
    Delete,
    /// Keep the history, detached from any entry and tagged with the old date
    Orphan,
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadePolicy::Delete => f.write_str("delete"),
            CascadePolicy::Orphan => f.write_str("orphan"),
        }
    }
}

impl FromStr for CascadePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(CascadePolicy::Delete),
            "orphan" => Ok(CascadePolicy::Orphan),
            other => Err(format!(
                "unknown cascade policy '{other}' (expected 'delete' or 'orphan')"
            )),
        }
    }
}

/// What a cascading delete touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// AI operations removed or orphaned
    pub ai_operations: usize,
    /// Audio records removed or orphaned
    pub audio_records: usize,
    /// Blob paths queued for physical removal
    pub queued_blobs: Vec<String>,
}

/// Delete one entry and resolve its history inside `tx`
///
/// The caller commits. Queued blobs are only recorded here; removing the
/// files happens after commit so a rolled-back delete never loses audio.
pub(crate) fn delete_cascading(
    tx: &Transaction,
    entry_id: &str,
    date: &EntryDate,
    policy: CascadePolicy,
) -> StorageResult<CascadeOutcome> {
    let mut outcome = CascadeOutcome::default();

    match policy {
        CascadePolicy::Delete => {
            let relpaths = {
                let mut stmt =
                    tx.prepare("SELECT audio_relpath FROM audio_records WHERE entry_id = ?1")?;
                let rows = stmt
                    .query_map(params![entry_id], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            let now = Utc::now().timestamp_millis();
            for relpath in &relpaths {
                tx.execute(
                    "INSERT OR IGNORE INTO blob_reclaim (audio_relpath, queued_at) VALUES (?1, ?2)",
                    params![relpath, now],
                )?;
            }

            outcome.audio_records = tx.execute(
                "DELETE FROM audio_records WHERE entry_id = ?1",
                params![entry_id],
            )?;
            outcome.ai_operations = tx.execute(
                "DELETE FROM ai_operations WHERE entry_id = ?1",
                params![entry_id],
            )?;
            outcome.queued_blobs = relpaths;
        }
        CascadePolicy::Orphan => {
            outcome.audio_records = tx.execute(
                "UPDATE audio_records SET entry_id = NULL, orphaned_from = ?2 WHERE entry_id = ?1",
                params![entry_id, date.as_str()],
            )?;
            outcome.ai_operations = tx.execute(
                "UPDATE ai_operations SET entry_id = NULL, orphaned_from = ?2 WHERE entry_id = ?1",
                params![entry_id, date.as_str()],
            )?;
        }
    }

    tx.execute(
        "DELETE FROM entries_fts WHERE entry_id = ?1",
        params![entry_id],
    )?;
    tx.execute("DELETE FROM entries WHERE id = ?1", params![entry_id])?;

    Ok(outcome)
}
