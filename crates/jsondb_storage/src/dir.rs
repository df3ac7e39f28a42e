//! Directory-level helpers.

use crate::error::StorageResult;
use crate::file::AtomicFile;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Syncs a directory so that entry creations, renames, and deletions in it
/// are durable.
///
/// On Windows, directory fsync is not supported in the same way as Unix.
/// NTFS journaling covers metadata durability there, so this is a no-op.
#[cfg(unix)]
pub fn sync_directory(dir: &Path) -> StorageResult<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Syncs a directory (no-op on this platform).
#[cfg(not(unix))]
pub fn sync_directory(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

/// Lists the names of regular files directly inside `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path) -> StorageResult<Vec<String>> {
    list_entries(dir, |ft| ft.is_file())
}

/// Lists the names of sub-directories directly inside `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_dirs(dir: &Path) -> StorageResult<Vec<String>> {
    list_entries(dir, |ft| ft.is_dir())
}

fn list_entries(dir: &Path, keep: impl Fn(&fs::FileType) -> bool) -> StorageResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !keep(&entry.file_type()?) {
            continue;
        }
        // Non UTF-8 names can't be collection names.
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Copies `src` to `dst` byte for byte, replacing `dst` atomically.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Fails with a "not found" I/O error if `src` does not exist.
pub fn copy_file(src: &Path, dst: &Path) -> StorageResult<u64> {
    let data = fs::read(src)?;
    AtomicFile::new(dst).write(&data)?;
    Ok(data.len() as u64)
}

/// Removes a file if present. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> StorageResult<bool> {
    AtomicFile::new(path).remove()
}
