//! Journal command: a line-based editing session with autosave
//!
//! Each input line is appended to the day's document as a paragraph.
//! Typing pauses trigger the debounced autosave exactly like an editor
//! would; a handful of `:` commands drive the rest of the session:
//!
//! - `:save` flush and wait until everything typed so far is on disk
//! - `:blur` flush as if the editor lost focus
//! - `:date YYYY-MM-DD` save this day and switch to another
//! - `:show` print the day's text
//! - `:quit` save and leave (end of input does the same)

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use daybook_core::content::plain_text;
use daybook_core::{EditSession, EntryDate, FlushOutcome, SaveStatus, Store, StoreHandle};

use crate::editor::append_paragraph;
use crate::output::Output;

/// Start a session on `date` reading lines from stdin
pub async fn run(store: Store, date: EntryDate, output: &Output) -> Result<()> {
    let debounce = store.config().autosave_debounce();
    let handle = StoreHandle::new(store);

    let session = EditSession::open(Arc::new(handle), date.clone(), debounce)
        .await
        .with_context(|| format!("Failed to open {}", date))?;

    let watcher = (!output.is_quiet()).then(|| spawn_status_printer(&session));

    output.message(&format!(
        "Writing {}. Type to append, :save, :date YYYY-MM-DD, :show, :quit",
        date
    ));

    let result = drive(&session, BufReader::new(tokio::io::stdin()), output).await;

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    result
}

/// Print every save status change to stderr
fn spawn_status_printer(session: &EditSession) -> tokio::task::JoinHandle<()> {
    let mut status = session.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            match current {
                SaveStatus::Idle => {}
                other => eprintln!("[{}]", other),
            }
        }
    })
}

/// Feed input lines into a session until `:quit` or end of input
///
/// The session is always closed on the way out so pending edits are saved.
pub async fn drive<R>(session: &EditSession, input: R, output: &Output) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim_end();

        match Command::parse(line) {
            Command::Quit => break,
            Command::Skip => {}
            Command::Append(text) => {
                let updated = append_paragraph(&session.content(), text);
                let revision = session.edit(updated);
                debug!("Appended line at revision {}", revision);
            }
            Command::Save => match session.save().await {
                Ok(_) => output.message(&format!("Saved {}", session.active_date())),
                Err(e) => output.warning(&format!("Save failed: {}", e)),
            },
            Command::Blur => match session.blur().await {
                Ok(FlushOutcome::Clean) => {}
                Ok(FlushOutcome::Saved { stale: true, .. }) => {
                    output.message("Saved; newer edits are still pending")
                }
                Ok(FlushOutcome::Saved { .. }) => {
                    output.message(&format!("Saved {}", session.active_date()))
                }
                Err(e) => output.warning(&format!("Save failed: {}", e)),
            },
            Command::Show => {
                println!("{}", plain_text(&session.content()));
            }
            Command::Date(value) => match EntryDate::parse(value) {
                Ok(date) => match session.switch_date(date.clone()).await {
                    Ok(()) => output.message(&format!("Now writing {}", date)),
                    Err(e) => output.warning(&format!("{}", e)),
                },
                Err(_) => output.warning(&format!("Invalid date '{}'. Use YYYY-MM-DD.", value)),
            },
            Command::Unknown(cmd) => output.warning(&format!("Unknown command :{}", cmd)),
        }
    }

    session
        .close()
        .await
        .with_context(|| format!("Failed to save {}", session.active_date()))?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Append(&'a str),
    Save,
    Blur,
    Show,
    Date(&'a str),
    Quit,
    Skip,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(rest) = line.strip_prefix(':') else {
            return if line.trim().is_empty() {
                Command::Skip
            } else {
                Command::Append(line)
            };
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("");
        let arg = parts.next().map(str::trim).unwrap_or("");

        match name {
            "save" | "w" => Command::Save,
            "blur" => Command::Blur,
            "show" => Command::Show,
            "date" => Command::Date(arg),
            "quit" | "q" => Command::Quit,
            _ => Command::Unknown(name),
        }
    }
}
