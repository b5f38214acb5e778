//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use daybook_core::content::plain_text;
use daybook_core::{AiOperation, AudioRecord, Entry, ImportReport, WritingStats};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &Entry) {
        match self.format {
            OutputFormat::Human => {
                println!("Date:    {}", entry.entry_date);
                if let Some(ref mood) = entry.mood {
                    let emoji = entry.mood_emoji.as_deref().unwrap_or("");
                    println!("Mood:    {} {}", mood, emoji);
                }
                println!("Created: {}", entry.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated: {}", entry.updated_at.format("%Y-%m-%d %H:%M"));
                println!();
                println!("{}", plain_text(&entry.content));
            }
            OutputFormat::Json => self.json(entry),
            OutputFormat::Quiet => println!("{}", entry.content),
        }
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[Entry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in entries {
                    let mood = entry
                        .mood_emoji
                        .as_deref()
                        .or(entry.mood.as_deref())
                        .unwrap_or(" ");
                    println!(
                        "{} {} | {}",
                        entry.entry_date,
                        mood,
                        truncate_line(&plain_text(&entry.content), 60)
                    );
                }
                println!("\n{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => self.json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.entry_date);
                }
            }
        }
    }

    /// Print the history attached to an entry
    pub fn print_history(&self, entry: &Entry, ops: &[AiOperation], audio: &[AudioRecord]) {
        match self.format {
            OutputFormat::Human => {
                println!("History for {}", entry.entry_date);
                println!();

                if ops.is_empty() && audio.is_empty() {
                    println!("No history on this entry.");
                    return;
                }

                for op in ops {
                    println!("────────────────────────────────────────");
                    println!(
                        "{}  {} ({} / {})",
                        op.created_at.format("%Y-%m-%d %H:%M"),
                        op.kind,
                        op.provider,
                        op.model
                    );
                    println!("  - {}", truncate_line(&op.original_text, 70));
                    println!("  + {}", truncate_line(&op.result_text, 70));
                }
                for record in audio {
                    println!("────────────────────────────────────────");
                    println!(
                        "{}  audio {}",
                        record.created_at.format("%Y-%m-%d %H:%M"),
                        record.audio_relpath
                    );
                    if let Some(ref voice) = record.voice {
                        println!("  voice: {}", voice);
                    }
                    println!("  {}", truncate_line(&record.text, 70));
                }
                println!();
                println!("{} ai operation(s), {} audio clip(s)", ops.len(), audio.len());
            }
            OutputFormat::Json => self.json(&serde_json::json!({
                "entry_date": entry.entry_date,
                "ai_operations": ops,
                "audio_records": audio,
            })),
            OutputFormat::Quiet => {
                for op in ops {
                    println!("{}", op.id);
                }
                for record in audio {
                    println!("{}", record.id);
                }
            }
        }
    }

    /// Print writing statistics
    pub fn print_stats(&self, stats: &WritingStats) {
        match self.format {
            OutputFormat::Human => {
                println!("Entries:        {}", stats.total_entries);
                println!("Current streak: {} day(s)", stats.current_streak);
                println!("Longest streak: {} day(s)", stats.longest_streak);
            }
            OutputFormat::Json => self.json(stats),
            OutputFormat::Quiet => println!("{}", stats.total_entries),
        }
    }

    /// Print the outcome of an import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "Imported {} entr{}, skipped {}, {} history record(s)",
                    report.imported,
                    plural_y(report.imported),
                    report.skipped,
                    report.history_imported
                );
                if !report.failures.is_empty() {
                    println!();
                    println!("{} record(s) failed:", report.failures.len());
                    for failure in &report.failures {
                        println!("  {}: {}", failure.record, failure.reason);
                    }
                }
                if !report.missing_audio.is_empty() {
                    println!();
                    println!(
                        "{} audio file(s) were not found; copy them into the audio folder to play them:",
                        report.missing_audio.len()
                    );
                    for relpath in &report.missing_audio {
                        println!("  {}", relpath);
                    }
                }
            }
            OutputFormat::Json => self.json(report),
            OutputFormat::Quiet => println!("{}", report.imported),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning (to stderr, except in JSON mode)
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("⚠ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Never splits a multi-byte character
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural_y(1), "y");
        assert_eq!(plural_y(3), "ies");
    }
}
