//! Command handlers, one module per top-level subcommand

pub mod backup;
pub mod config;
pub mod entry;
pub mod history;
pub mod journal;
pub mod mood;
pub mod status;

use anyhow::{Context, Result};

use daybook_core::EntryDate;

/// Parse a date argument, defaulting to today
pub fn parse_date(date: Option<&str>) -> Result<EntryDate> {
    match date {
        None | Some("today") => Ok(EntryDate::today()),
        Some(value) => EntryDate::parse(value)
            .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD.", value)),
    }
}
