//! Daybook CLI
//!
//! Command-line interface for Daybook - one journal document per day.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daybook_core::{Config, ImportOptions, Store};

mod commands;
mod editor;
mod output;

use commands::entry::Source;
use commands::parse_date;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Daybook - a local-first journal, one document per day")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write interactively with autosave (default)
    Journal {
        /// Day to open (YYYY-MM-DD, default today)
        date: Option<String>,
    },
    /// Manage entries
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Tag a day with a mood
    Mood {
        #[command(subcommand)]
        command: MoodCommands,
    },
    /// Show AI and audio history for a day
    History {
        /// Day (YYYY-MM-DD, default today)
        date: Option<String>,
    },
    /// Show storage location and writing stats
    Status,
    /// Write a snapshot of all entries and history
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a snapshot
    Import {
        /// Snapshot file
        file: PathBuf,
        /// Replace local entries for dates present in the snapshot
        #[arg(long)]
        overwrite: bool,
        /// Also import AI operations and audio records
        #[arg(long)]
        include_history: bool,
    },
    /// Retry removal of audio files left behind by deletes
    Reclaim,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// Show the entry for a day
    #[command(alias = "show")]
    Get {
        /// Day (YYYY-MM-DD, default today)
        date: Option<String>,
    },
    /// Replace the content for a day (opens editor if no text is given)
    Write {
        /// Day (YYYY-MM-DD, default today)
        date: Option<String>,
        /// Entry text
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
        /// Read text from a file, or `-` for stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Store the input verbatim instead of wrapping it as a document
        #[arg(long)]
        raw: bool,
    },
    /// List a month of entries, newest first
    #[command(alias = "ls")]
    List {
        /// Month (YYYY-MM, default current)
        #[arg(short, long)]
        month: Option<String>,
        /// Only entries with this mood
        #[arg(long)]
        mood: Option<String>,
    },
    /// Search entry text
    Search {
        /// Search terms
        query: String,
    },
    /// Delete the entry for a day
    #[command(alias = "rm")]
    Delete {
        /// Day (YYYY-MM-DD)
        date: String,
        /// What happens to the day's history: delete or orphan
        #[arg(long)]
        policy: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum MoodCommands {
    /// Set the mood for a day
    Set {
        /// Mood label
        mood: String,
        /// Day (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,
        /// Emoji shown next to the mood
        #[arg(short, long)]
        emoji: Option<String>,
    },
    /// Remove the mood from a day
    Clear {
        /// Day (YYYY-MM-DD, default today)
        date: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, autosave_debounce_ms, cascade_policy, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands must work even when the stored config is broken
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    let mut store = Store::open_with_config(config).context("Failed to open daybook")?;

    match cli.command.unwrap_or(Commands::Journal { date: None }) {
        Commands::Journal { date } => {
            let date = parse_date(date.as_deref())?;
            commands::journal::run(store, date, &output).await
        }
        Commands::Entry { command } => handle_entry_command(command, &mut store, &output),
        Commands::Mood { command } => handle_mood_command(command, &mut store, &output),
        Commands::History { date } => {
            commands::history::show(&store, parse_date(date.as_deref())?, &output)
        }
        Commands::Status => commands::status::show(&store, &output),
        Commands::Export { output: path } => commands::backup::export(&store, path, &output),
        Commands::Import {
            file,
            overwrite,
            include_history,
        } => commands::backup::import(
            &mut store,
            file,
            ImportOptions {
                overwrite,
                include_history,
            },
            &output,
        ),
        Commands::Reclaim => commands::status::reclaim(&store, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_entry_command(command: EntryCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        EntryCommands::Get { date } => {
            commands::entry::get(store, parse_date(date.as_deref())?, output)
        }
        EntryCommands::Write {
            date,
            text,
            file,
            raw,
        } => {
            let source = match (text, file) {
                (Some(text), _) => Source::Text(text),
                (None, Some(file)) => Source::File(file),
                (None, None) => Source::Editor,
            };
            commands::entry::write(store, parse_date(date.as_deref())?, source, raw, output)
        }
        EntryCommands::List { month, mood } => commands::entry::list(store, month, mood, output),
        EntryCommands::Search { query } => commands::entry::search(store, query, output),
        EntryCommands::Delete { date, policy, yes } => {
            commands::entry::delete(store, parse_date(Some(date.as_str()))?, policy, yes, output)
        }
    }
}

fn handle_mood_command(command: MoodCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        MoodCommands::Set { mood, date, emoji } => {
            commands::mood::set(store, parse_date(date.as_deref())?, mood, emoji, output)
        }
        MoodCommands::Clear { date } => {
            commands::mood::clear(store, parse_date(date.as_deref())?, output)
        }
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Initialize tracing for the daybook crates
///
/// RUST_LOG wins over the configured level. Logs go to the configured file
/// when one is set, otherwise to stderr.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "daybook_core={lvl},daybook_cli={lvl}",
            lvl = config.log_level
        ))
    });

    let log_file = config.log_file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = match log_file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}
