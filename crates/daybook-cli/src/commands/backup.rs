//! Export and import command handlers

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};

use daybook_core::{ImportOptions, Snapshot, Store};

use crate::output::Output;

/// Write a snapshot of everything to a file, or stdout
pub fn export(store: &Store, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let snapshot = store.export().context("Failed to build snapshot")?;

    match path {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {:?}", path))?;
            snapshot
                .write_json(BufWriter::new(file))
                .with_context(|| format!("Failed to write {:?}", path))?;
            output.success(&format!(
                "Exported {} entr{} to {}",
                snapshot.entries.len(),
                if snapshot.entries.len() == 1 { "y" } else { "ies" },
                path.display()
            ));
        }
        None => {
            snapshot
                .write_json(io::stdout().lock())
                .context("Failed to write snapshot")?;
            println!();
        }
    }

    Ok(())
}

/// Restore a snapshot file
pub fn import(
    store: &mut Store,
    path: PathBuf,
    options: ImportOptions,
    output: &Output,
) -> Result<()> {
    let file = File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
    let snapshot = Snapshot::read_json(BufReader::new(file))
        .with_context(|| format!("{:?} is not a daybook snapshot", path))?;

    let report = store.import(&snapshot, options)?;
    output.print_import_report(&report);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use daybook_core::{Config, EntryDate};
    use tempfile::TempDir;

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let output = Output::new(OutputFormat::Quiet);
        let date = EntryDate::parse("2026-07-04").unwrap();

        let mut source =
            Store::open_with_config(Config::with_data_dir(source_dir.path())).unwrap();
        source.upsert(&date, "fireworks").unwrap();

        let file = source_dir.path().join("snapshot.json");
        export(&source, Some(file.clone()), &output).unwrap();

        let mut target =
            Store::open_with_config(Config::with_data_dir(target_dir.path())).unwrap();
        import(&mut target, file, ImportOptions::default(), &output).unwrap();

        assert_eq!(target.get(&date).unwrap().unwrap().content, "fireworks");
    }

    #[test]
    fn test_import_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let output = Output::new(OutputFormat::Quiet);
        let mut store = Store::open_with_config(Config::with_data_dir(temp_dir.path())).unwrap();

        let file = temp_dir.path().join("notes.txt");
        std::fs::write(&file, "not json").unwrap();

        let err = import(&mut store, file, ImportOptions::default(), &output).unwrap_err();
        assert!(err.to_string().contains("is not a daybook snapshot"));
    }
}
