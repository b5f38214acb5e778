//! Scheduler state machine
//!
//! ```text
//! Clean --edit--> Dirty --flush--> Saving --ok, same revision--> Clean
//!                                        --ok, newer revision--> Dirty
//!                                        --error--------------> Failed
//! Failed --edit--> Dirty
//! Failed --save--> Saving
//! ```
//!
//! Edits after a failure leave the error on the status indicator; only a
//! successful flush clears it.

use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use thiserror::Error;

use crate::date_key::EntryDate;
use crate::models::Entry;
use crate::storage::StorageError;

/// Errors surfaced by an edit session
///
/// Cloneable so every caller waiting on a coalesced flush gets the same error.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("Failed to save entry for {date}: {source}")]
    Save {
        date: EntryDate,
        #[source]
        source: Arc<StorageError>,
    },

    #[error("Failed to load entry for {date}: {source}")]
    Load {
        date: EntryDate,
        #[source]
        source: Arc<StorageError>,
    },

    /// The outgoing date could not be saved; the session still shows it
    #[error("Cannot switch from {from} to {to}: {source}")]
    SwitchAborted {
        from: EntryDate,
        to: EntryDate,
        #[source]
        source: Box<SessionError>,
    },

    #[error("Cannot mark {date} dirty: the active date is {active}")]
    InactiveDate { date: EntryDate, active: EntryDate },
}

impl SessionError {
    /// The storage failure underneath, if any
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            SessionError::Save { source, .. } | SessionError::Load { source, .. } => {
                Some(source.as_ref())
            }
            SessionError::SwitchAborted { source, .. } => source.storage_error(),
            SessionError::InactiveDate { .. } => None,
        }
    }
}

/// What a completed flush did
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing was dirty
    Clean,
    /// Content up to `revision` is durable
    Saved {
        entry: Entry,
        revision: u64,
        /// Edits arrived while saving; the session is still dirty
        stale: bool,
    },
}

impl FlushOutcome {
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            FlushOutcome::Clean => None,
            FlushOutcome::Saved { entry, .. } => Some(entry),
        }
    }
}

pub type FlushResult = Result<FlushOutcome, SessionError>;

/// A flush every waiter can await
pub(crate) type SharedFlush = Shared<BoxFuture<'static, FlushResult>>;

/// User-visible save indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum SaveStatus {
    /// Nothing saved yet, or edits pending
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Idle => f.write_str("idle"),
            SaveStatus::Saving => f.write_str("saving"),
            SaveStatus::Saved => f.write_str("saved"),
            SaveStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

pub(crate) enum Phase {
    Clean,
    Dirty,
    Saving {
        /// Revision captured when the flush started
        revision: u64,
        flush: SharedFlush,
    },
    Failed {
        error: SessionError,
    },
}

impl Phase {
    pub(crate) fn is_clean(&self) -> bool {
        matches!(self, Phase::Clean)
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Clean => f.write_str("Clean"),
            Phase::Dirty => f.write_str("Dirty"),
            Phase::Saving { revision, .. } => write!(f, "Saving({})", revision),
            Phase::Failed { error } => write!(f, "Failed({})", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(SaveStatus::Saved.to_string(), "saved");
        assert_eq!(
            SaveStatus::Error("disk full".to_string()).to_string(),
            "error: disk full"
        );
    }

    #[test]
    fn test_switch_error_exposes_storage_cause() {
        let from = EntryDate::parse("2026-01-01").unwrap();
        let to = EntryDate::parse("2026-01-02").unwrap();
        let save = SessionError::Save {
            date: from.clone(),
            source: Arc::new(StorageError::Background("pool gone".to_string())),
        };
        let err = SessionError::SwitchAborted {
            from,
            to,
            source: Box::new(save),
        };

        assert!(matches!(
            err.storage_error(),
            Some(StorageError::Background(_))
        ));
        assert!(err.to_string().contains("2026-01-02"));
    }
}
