//! Status and maintenance command handlers

use anyhow::Result;

use daybook_core::Store;

use crate::output::{Output, OutputFormat};

/// Show storage location, schema version and writing stats
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.stats()?;
    let config = store.config();
    let schema_version = store.schema_version()?;
    let pending = store.database().pending_reclaims()?.len();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "database": config.database_path(),
                    "schema_version": schema_version,
                    "cascade_policy": config.cascade_policy,
                    "autosave_debounce_ms": config.autosave_debounce_ms,
                    "pending_reclaims": pending,
                    "stats": stats,
                })
            );
        }
        OutputFormat::Quiet => output.print_stats(&stats),
        OutputFormat::Human => {
            println!("Daybook Status");
            println!("==============");
            println!();
            println!("Storage:");
            println!("  Location:  {}", config.data_dir.display());
            println!("  Schema:    v{}", schema_version);
            println!("  On delete: {} history", config.cascade_policy);
            if pending > 0 {
                println!("  Pending audio cleanup: {} file(s)", pending);
            }
            println!();
            println!("Writing:");
            output.print_stats(&stats);
        }
    }

    Ok(())
}

/// Retry removal of audio files left behind by earlier deletes
pub fn reclaim(store: &Store, output: &Output) -> Result<()> {
    let report = store.reclaim_blobs()?;

    match output.format {
        OutputFormat::Json => output.json(&report),
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            if report.removed.is_empty() && report.failed.is_empty() {
                println!("Nothing to clean up.");
                return Ok(());
            }
            if !report.removed.is_empty() {
                output.success(&format!("Removed {} audio file(s)", report.removed.len()));
            }
            for (path, reason) in &report.failed {
                output.warning(&format!("{}: {}", path, reason));
            }
        }
    }

    if !report.is_clean() {
        anyhow::bail!("{} audio file(s) could not be removed", report.failed.len());
    }
    Ok(())
}
