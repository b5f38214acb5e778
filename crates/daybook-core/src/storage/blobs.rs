//! Audio blob tree
//!
//! Synthesized audio lives under `<data_dir>/audio/<date>/<id>.<ext>`.
//! Records store the path relative to the data directory, always with
//! forward slashes, so a data directory can move between machines.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::date_key::EntryDate;
use crate::storage::error::{StorageError, StorageResult};

/// Result of a reclamation pass over queued blobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    /// Paths whose files are gone (removed now or already missing)
    pub removed: Vec<String>,
    /// Paths that could not be removed, with the reason; they stay queued
    pub failed: Vec<(String, String)>,
}

impl ReclaimReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Filesystem side of audio storage
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Blob store rooted at the data directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path for a new clip belonging to `date`
    pub fn new_relpath(date: &EntryDate, format: &str) -> String {
        let ext = format.trim_start_matches('.');
        let ext = if ext.is_empty() { "bin" } else { ext };
        format!("audio/{}/{}.{}", date, Uuid::new_v4(), ext)
    }

    /// Resolve a stored relative path to an absolute one
    pub fn resolve(&self, relpath: &str) -> StorageResult<PathBuf> {
        validate_relpath(relpath)?;
        Ok(relpath
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part)))
    }

    /// Write a blob atomically
    pub fn write(&self, relpath: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let path = self.resolve(relpath)?;
        atomic_write(&path, bytes)?;
        Ok(path)
    }

    /// Read a blob
    pub fn read(&self, relpath: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(relpath)?;
        fs::read(&path).map_err(|e| StorageError::from_io(e, path))
    }

    pub fn exists(&self, relpath: &str) -> bool {
        self.resolve(relpath).map(|p| p.exists()).unwrap_or(false)
    }

    /// Remove a blob
    ///
    /// Returns `Ok(false)` when the file was already gone.
    pub fn remove(&self, relpath: &str) -> StorageResult<bool> {
        let path = self.resolve(relpath)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                // Drop the per-day directory once it's empty; a non-empty
                // directory just fails, which is fine.
                if let Some(parent) = path.parent() {
                    let _ = fs::remove_dir(parent);
                }
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_io(e, path)),
        }
    }
}

/// Reject absolute paths and anything that could escape the data directory
fn validate_relpath(relpath: &str) -> StorageResult<()> {
    let invalid = || StorageError::invalid("blob path", relpath, "a relative path inside the data directory");

    if relpath.is_empty() || relpath.starts_with('/') || relpath.contains('\\') {
        return Err(invalid());
    }

    for component in Path::new(relpath).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }

    Ok(())
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}
