//! Data models for Daybook
//!
//! Defines the persisted records: the per-day `Entry` and the append-only
//! `AiOperation` and `AudioRecord` history attached to it.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date_key::EntryDate;

/// Content written for an entry that only carries a mood
pub const EMPTY_CONTENT: &str = "{}";

/// The single document for one calendar day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Unique identifier, stable across content updates
    pub id: Uuid,
    /// Calendar day this entry belongs to
    pub entry_date: EntryDate,
    /// Structured content payload, stored byte-for-byte
    pub content: String,
    /// Mood category (e.g. "happy")
    pub mood: Option<String>,
    /// Display glyph for the mood
    pub mood_emoji: Option<String>,
    /// When this entry was first saved
    pub created_at: DateTime<Utc>,
    /// When the content or mood last changed
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Create a fresh entry for a date
    pub fn new(entry_date: EntryDate, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entry_date,
            content: content.into(),
            mood: None,
            mood_emoji: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The text transformation an AI operation performed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AiOpKind {
    Polish,
    Expand,
    FixGrammar,
    Translate,
    /// A kind this build does not know; kept verbatim
    Other(String),
}

impl AiOpKind {
    pub fn as_str(&self) -> &str {
        match self {
            AiOpKind::Polish => "polish",
            AiOpKind::Expand => "expand",
            AiOpKind::FixGrammar => "fix_grammar",
            AiOpKind::Translate => "translate",
            AiOpKind::Other(kind) => kind,
        }
    }
}

impl From<String> for AiOpKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "polish" => AiOpKind::Polish,
            "expand" => AiOpKind::Expand,
            "fix_grammar" | "fix-grammar" => AiOpKind::FixGrammar,
            "translate" => AiOpKind::Translate,
            _ => AiOpKind::Other(value),
        }
    }
}

impl From<&str> for AiOpKind {
    fn from(value: &str) -> Self {
        AiOpKind::from(value.to_string())
    }
}

impl From<AiOpKind> for String {
    fn from(kind: AiOpKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AiOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one AI text operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiOperation {
    pub id: Uuid,
    /// Owning entry; `None` once detached by the orphan policy
    pub entry_id: Option<Uuid>,
    /// Date of the deleted owner, set only on orphaned records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned_from: Option<EntryDate>,
    #[serde(rename = "op_type")]
    pub kind: AiOpKind,
    pub original_text: String,
    pub result_text: String,
    pub provider: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// Fields of an AI operation before it is recorded
#[derive(Debug, Clone)]
pub struct NewAiOperation {
    pub kind: AiOpKind,
    pub original_text: String,
    pub result_text: String,
    pub provider: String,
    pub model: String,
}

impl NewAiOperation {
    /// Turn the request into a record owned by `entry_id`
    pub fn into_record(self, entry_id: Uuid) -> AiOperation {
        AiOperation {
            id: Uuid::new_v4(),
            entry_id: Some(entry_id),
            orphaned_from: None,
            kind: self.kind,
            original_text: self.original_text,
            result_text: self.result_text,
            provider: self.provider,
            model: self.model,
            created_at: Utc::now(),
        }
    }
}

/// Immutable metadata for a synthesized audio clip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioRecord {
    pub id: Uuid,
    /// Owning entry; `None` once detached by the orphan policy
    pub entry_id: Option<Uuid>,
    /// Date of the deleted owner, set only on orphaned records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned_from: Option<EntryDate>,
    /// Text that was synthesized
    pub text: String,
    /// Blob location relative to the data directory
    pub audio_relpath: String,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate writing statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingStats {
    pub total_entries: i64,
    /// Consecutive days with an entry, ending today or yesterday
    pub current_streak: i64,
    pub longest_streak: i64,
}

impl WritingStats {
    /// Compute stats from ascending date keys
    pub fn from_dates(dates: &[EntryDate], today: NaiveDate) -> Self {
        let days: Vec<NaiveDate> = dates.iter().map(EntryDate::to_naive).collect();
        Self {
            total_entries: days.len() as i64,
            current_streak: current_streak(&days, today),
            longest_streak: longest_streak(&days),
        }
    }
}

/// Count back from today (or yesterday, if today has no entry yet)
fn current_streak(days: &[NaiveDate], today: NaiveDate) -> i64 {
    let Some(yesterday) = today.pred_opt() else {
        return 0;
    };

    let mut expected = if days.contains(&today) {
        today
    } else {
        yesterday
    };
    let mut streak = 0;

    for day in days.iter().rev() {
        if *day > expected {
            // Future-dated entries don't break or extend the streak.
            continue;
        }
        if *day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }

    streak
}

fn longest_streak(days: &[NaiveDate]) -> i64 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        run = match prev {
            Some(p) if (*day - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }

    longest
}
