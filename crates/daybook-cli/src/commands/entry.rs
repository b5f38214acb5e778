//! Entry command handlers

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use daybook_core::content::plain_text;
use daybook_core::{CascadePolicy, EntryDate, Month, Store};

use crate::editor::{confirm, edit_text, text_to_doc};
use crate::output::{Output, OutputFormat};

/// Where new entry text comes from
pub enum Source {
    /// Given on the command line
    Text(String),
    /// Read from a file, or stdin for `-`
    File(PathBuf),
    /// Opened in $EDITOR
    Editor,
}

/// Show the entry for a date
pub fn get(store: &Store, date: EntryDate, output: &Output) -> Result<()> {
    let entry = store
        .get(&date)?
        .ok_or_else(|| anyhow::anyhow!("No entry for {}", date))?;

    output.print_entry(&entry);
    Ok(())
}

/// Replace the content for a date
///
/// Text is wrapped as a document unless `raw` is set, in which case it is
/// stored exactly as given.
pub fn write(
    store: &mut Store,
    date: EntryDate,
    source: Source,
    raw: bool,
    output: &Output,
) -> Result<()> {
    let text = match source {
        Source::Text(text) => text,
        Source::File(path) => read_source(&path)?,
        Source::Editor => {
            let current = store
                .get(&date)?
                .map(|entry| plain_text(&entry.content))
                .unwrap_or_default();
            let header = format!(
                "Entry for {}\nLines starting with #> are ignored. Blank lines separate paragraphs.",
                date
            );
            edit_text(&header, &current).context("Failed to edit entry")?
        }
    };

    let content = if raw { text } else { text_to_doc(&text) };
    let entry = store
        .upsert(&date, &content)
        .with_context(|| format!("Failed to save entry for {}", date))?;

    if output.is_json() {
        output.json(&entry);
    } else {
        output.success(&format!("Saved entry for {}", entry.entry_date));
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read entry from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
    }
}

/// List the entries of a month, newest first
pub fn list(
    store: &Store,
    month: Option<String>,
    mood: Option<String>,
    output: &Output,
) -> Result<()> {
    let month = match month {
        Some(value) => Month::parse(&value)
            .with_context(|| format!("Invalid month '{}'. Use YYYY-MM.", value))?,
        None => Month::current(),
    };

    let entries = match mood {
        Some(mood) => store.list_by_mood(&month, &mood)?,
        None => store.list_by_month(&month)?,
    };

    output.print_entries(&entries);
    Ok(())
}

/// Full-text search across all entries
pub fn search(store: &Store, query: String, output: &Output) -> Result<()> {
    let entries = store.search(&query)?;

    if entries.is_empty() && output.format == OutputFormat::Human {
        println!("No entries matching '{}'", query);
        return Ok(());
    }

    output.print_entries(&entries);
    Ok(())
}

/// Delete the entry for a date and resolve its history
pub fn delete(
    store: &mut Store,
    date: EntryDate,
    policy: Option<String>,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let policy = match policy {
        Some(value) => value.parse::<CascadePolicy>().map_err(anyhow::Error::msg)?,
        None => store.config().cascade_policy,
    };

    if store.get(&date)?.is_none() {
        bail!("No entry for {}", date);
    }

    if !yes && output.should_prompt() {
        let history = match policy {
            CascadePolicy::Delete => "its AI and audio history will be deleted",
            CascadePolicy::Orphan => "its AI and audio history will be kept",
        };
        let prompt = format!("Delete entry for {}? ({})", date, history);
        if !confirm(&prompt)? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    let report = store.delete_with_policy(&date, policy)?;

    match output.format {
        OutputFormat::Json => output.json(&report),
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            let verb = match policy {
                CascadePolicy::Delete => "removed",
                CascadePolicy::Orphan => "detached",
            };
            output.success(&format!(
                "Deleted entry for {} ({} ai operation(s), {} audio clip(s) {})",
                date, report.ai_operations, report.audio_records, verb
            ));
            for (path, reason) in &report.reclaim.failed {
                output.warning(&format!(
                    "Audio file {} is still on disk ({}); run `daybook reclaim` to retry",
                    path, reason
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_core::Config;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> Store {
        Store::open_with_config(Config::with_data_dir(temp_dir.path())).unwrap()
    }

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_write_wraps_text_as_doc() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store(&temp_dir);
        let date = EntryDate::parse("2026-05-01").unwrap();

        write(
            &mut store,
            date.clone(),
            Source::Text("Rain all day.\n\nRead a book.".to_string()),
            false,
            &quiet(),
        )
        .unwrap();

        let entry = store.get(&date).unwrap().unwrap();
        assert!(entry.content.starts_with('{'));
        assert_eq!(plain_text(&entry.content), "Rain all day. Read a book.");
    }

    #[test]
    fn test_write_raw_is_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store(&temp_dir);
        let date = EntryDate::parse("2026-05-02").unwrap();

        write(
            &mut store,
            date.clone(),
            Source::Text("  exact  ".to_string()),
            true,
            &quiet(),
        )
        .unwrap();

        assert_eq!(store.get(&date).unwrap().unwrap().content, "  exact  ");
    }

    #[test]
    fn test_write_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store(&temp_dir);
        let date = EntryDate::parse("2026-05-03").unwrap();
        let path = temp_dir.path().join("draft.txt");
        fs::write(&path, "from a file").unwrap();

        write(&mut store, date.clone(), Source::File(path), false, &quiet()).unwrap();

        let entry = store.get(&date).unwrap().unwrap();
        assert_eq!(plain_text(&entry.content), "from a file");
    }

    #[test]
    fn test_get_missing_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let err = get(&store, EntryDate::parse("2026-05-04").unwrap(), &quiet()).unwrap_err();
        assert!(err.to_string().contains("No entry for 2026-05-04"));
    }

    #[test]
    fn test_list_rejects_bad_month() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert!(list(&store, Some("2026-13".to_string()), None, &quiet()).is_err());
        assert!(list(&store, Some("2026-05".to_string()), None, &quiet()).is_ok());
    }

    #[test]
    fn test_delete_without_prompt_in_quiet_mode() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store(&temp_dir);
        let date = EntryDate::parse("2026-05-05").unwrap();
        store.upsert(&date, "bye").unwrap();

        delete(&mut store, date.clone(), Some("orphan".to_string()), false, &quiet()).unwrap();

        assert!(store.get(&date).unwrap().is_none());
    }

    #[test]
    fn test_delete_rejects_unknown_policy() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store(&temp_dir);
        let date = EntryDate::parse("2026-05-06").unwrap();
        store.upsert(&date, "stay").unwrap();

        let result = delete(&mut store, date.clone(), Some("shred".to_string()), true, &quiet());
        assert!(result.is_err());
        assert!(store.get(&date).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store(&temp_dir);

        let date = EntryDate::parse("2026-05-07").unwrap();
        assert!(delete(&mut store, date, None, true, &quiet()).is_err());
    }
}
