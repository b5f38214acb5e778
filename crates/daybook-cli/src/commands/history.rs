//! History command handler

use anyhow::Result;

use daybook_core::{EntryDate, Store};

use crate::output::Output;

/// Show the AI operations and audio clips attached to a day, newest first
pub fn show(store: &Store, date: EntryDate, output: &Output) -> Result<()> {
    let entry = store
        .get(&date)?
        .ok_or_else(|| anyhow::anyhow!("No entry for {}", date))?;

    let ops = store.list_ai_operations(&entry.id)?;
    let audio = store.list_audio_records(&entry.id)?;

    output.print_history(&entry, &ops, &audio);
    Ok(())
}
