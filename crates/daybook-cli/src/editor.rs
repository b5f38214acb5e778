//! Interactive editing support
//!
//! Opens $EDITOR on a day's text and converts between plain text and the
//! rich-text document payload entries are stored as.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::Command;

/// Lines starting with this marker are stripped from edited text
const COMMENT_MARKER: &str = "#>";

/// Open text in the user's preferred editor
///
/// Uses $EDITOR, $VISUAL, or falls back to common editors. The `header`
/// is shown as comment lines and removed from the result.
pub fn edit_text(header: &str, initial_content: &str) -> Result<String> {
    let editor = find_editor()?;

    let temp_path = env::temp_dir().join(format!("daybook_entry_{}.txt", std::process::id()));

    let mut seeded = String::new();
    for line in header.lines() {
        seeded.push_str(COMMENT_MARKER);
        seeded.push(' ');
        seeded.push_str(line);
        seeded.push('\n');
    }
    seeded.push('\n');
    seeded.push_str(initial_content);

    fs::write(&temp_path, seeded)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = Command::new(&editor)
        .arg(&temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        let _ = fs::remove_file(&temp_path);
        bail!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        );
    }

    let content = fs::read_to_string(&temp_path)
        .with_context(|| format!("Failed to read edited file: {:?}", temp_path))?;

    let _ = fs::remove_file(&temp_path);

    Ok(strip_comments(&content))
}

fn strip_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Wrap plain text as a document payload, one paragraph per block
///
/// Blocks are separated by blank lines; single newlines stay inside the
/// paragraph text.
pub fn text_to_doc(text: &str) -> String {
    let paragraphs: Vec<Value> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(paragraph)
        .collect();

    json!({"type": "doc", "content": paragraphs}).to_string()
}

/// Append one paragraph to an existing document payload
///
/// Payloads that aren't a document are replaced by a fresh one holding the
/// previous text followed by the new paragraph.
pub fn append_paragraph(content: &str, text: &str) -> String {
    if let Ok(mut doc) = serde_json::from_str::<Value>(content) {
        if let Some(blocks) = doc.get_mut("content").and_then(Value::as_array_mut) {
            blocks.push(paragraph(text));
            return doc.to_string();
        }
    }

    let previous = daybook_core::content::plain_text(content);
    if previous.trim().is_empty() {
        text_to_doc(text)
    } else {
        text_to_doc(&format!("{}\n\n{}", previous, text))
    }
}

fn paragraph(text: &str) -> Value {
    json!({
        "type": "paragraph",
        "content": [{"type": "text", "text": text}]
    })
}

/// Find the user's preferred editor
fn find_editor() -> Result<String> {
    if let Ok(editor) = env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    if let Ok(visual) = env::var("VISUAL") {
        if !visual.is_empty() {
            return Ok(visual);
        }
    }

    let common_editors = ["nano", "vim", "vi", "emacs", "notepad"];

    for editor in common_editors {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set $EDITOR environment variable.\n\
         Example: export EDITOR=nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
