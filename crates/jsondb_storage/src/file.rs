//! Whole-file storage with atomic replacement.

use crate::dir::sync_directory;
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix of in-flight temporary files.
///
/// Anything ending in this suffix is an interrupted or in-progress write and
/// must never be treated as data.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A file that is only ever replaced as a whole.
///
/// # Durability
///
/// [`AtomicFile::write`] follows the write-then-rename pattern:
/// 1. Write to a temporary file in the same directory
/// 2. Sync the temporary file to disk
/// 3. Rename the temporary file over the target
/// 4. Fsync the directory so the rename itself is durable
///
/// A reader therefore sees either the old content or the new content, never
/// a torn mix, on filesystems with atomic rename.
///
/// # Example
///
/// ```no_run
/// use jsondb_storage::AtomicFile;
///
/// let file = AtomicFile::new("data/notices.json");
/// file.write(b"[]").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    /// Creates a handle for the file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the file currently exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the whole file.
    ///
    /// Returns `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for any I/O failure other than "not found".
    pub fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replaces the file content with `data`.
    ///
    /// Parent directories are created if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written or renamed. On
    /// error the previous content is left in place and the temp file is
    /// removed on a best-effort basis.
    pub fn write(&self, data: &[u8]) -> StorageResult<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(self.path.clone()))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(self.path.clone()))?;

        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }

        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.path.with_file_name(format!(
            "{}.{}.{seq}{TEMP_SUFFIX}",
            file_name.to_string_lossy(),
            std::process::id()
        ));

        if let Err(e) = write_synced(&temp_path, data) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        sync_directory(parent)?;
        Ok(())
    }

    /// Removes the file. Absence is not an error.
    ///
    /// Returns whether a file was removed.
    pub fn remove(&self) -> StorageResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}
