//! Mood command handlers

use anyhow::{Context, Result};

use daybook_core::{EntryDate, Store};

use crate::output::Output;

/// Tag a day with a mood, creating an empty entry if needed
pub fn set(
    store: &mut Store,
    date: EntryDate,
    mood: String,
    emoji: Option<String>,
    output: &Output,
) -> Result<()> {
    let entry = store
        .set_mood(&date, Some(&mood), emoji.as_deref())
        .with_context(|| format!("Failed to set mood for {}", date))?;

    if output.is_json() {
        output.json(&entry);
    } else {
        output.success(&format!("Mood for {} set to {}", entry.entry_date, mood));
    }
    Ok(())
}

/// Remove the mood from a day
pub fn clear(store: &mut Store, date: EntryDate, output: &Output) -> Result<()> {
    if store.get(&date)?.is_none() {
        anyhow::bail!("No entry for {}", date);
    }

    let entry = store.set_mood(&date, None, None)?;

    if output.is_json() {
        output.json(&entry);
    } else {
        output.success(&format!("Cleared mood for {}", entry.entry_date));
    }
    Ok(())
}
