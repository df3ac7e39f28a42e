//! Per-collection snapshot backups.
//!
//! Before a collection file is overwritten, its previous bytes are copied
//! verbatim to `<backup_dir>/<base>_<epoch-ms>.json`. Once a collection has
//! more than `max_backups` such snapshots the oldest are deleted.
//!
//! Restores write an extra safety snapshot of the content they replace,
//! named `<base>_restore_backup_<epoch-ms>.json`. Safety snapshots count
//! towards the same retention limit as regular ones.
//!
//! ## Usage
//!
//! ```ignore
//! use jsondb_core::backup::BackupManager;
//!
//! let backups = BackupManager::new("data/backups", 50);
//! backups.snapshot("notices.json", &previous_bytes, Timestamp::now())?;
//! backups.prune("notices.json")?;
//! let newest_first = backups.list("notices.json")?;
//! ```

use crate::dir::{base_name, validate_name, COLLECTION_EXT};
use crate::error::CoreResult;
use crate::types::Timestamp;
use jsondb_storage::{list_files, remove_if_exists, AtomicFile};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Infix of snapshots taken by a restore.
const RESTORE_INFIX: &str = "restore_backup";

/// One snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    /// File name inside the backup directory.
    pub file_name: String,
    /// Embedded timestamp, zero for names this manager did not write.
    pub timestamp: Timestamp,
    /// Full path of the snapshot.
    pub path: PathBuf,
}

/// Creates, lists, prunes, and reads snapshots.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    /// Creates a manager over `dir` keeping `max_backups` snapshots per
    /// collection.
    pub fn new(dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            dir: dir.into(),
            max_backups,
        }
    }

    /// Returns the backup directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the retention limit.
    #[must_use]
    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Stores `data` as the snapshot of `filename` taken at `at`.
    ///
    /// If a snapshot with that stamp exists already (two writes in the same
    /// millisecond) the stamp is bumped until the name is free, so no
    /// snapshot ever overwrites another.
    pub fn snapshot(&self, filename: &str, data: &[u8], at: Timestamp) -> CoreResult<BackupEntry> {
        validate_name(filename)?;
        let base = base_name(filename);
        self.store_unique(data, at, |stamp| format!("{base}_{stamp}{COLLECTION_EXT}"))
    }

    /// Stores `data` as the pre-restore safety snapshot of `filename`.
    pub fn safety_snapshot(
        &self,
        filename: &str,
        data: &[u8],
        at: Timestamp,
    ) -> CoreResult<BackupEntry> {
        validate_name(filename)?;
        let base = base_name(filename);
        self.store_unique(data, at, |stamp| {
            format!("{base}_{RESTORE_INFIX}_{stamp}{COLLECTION_EXT}")
        })
    }

    fn store_unique(
        &self,
        data: &[u8],
        at: Timestamp,
        name_for: impl Fn(u64) -> String,
    ) -> CoreResult<BackupEntry> {
        fs::create_dir_all(&self.dir)?;

        let mut stamp = at.as_millis();
        let (file_name, path) = loop {
            let file_name = name_for(stamp);
            let path = self.dir.join(&file_name);
            if !path.exists() {
                break (file_name, path);
            }
            stamp += 1;
        };

        AtomicFile::new(&path).write(data)?;
        debug!(snapshot = %file_name, bytes = data.len(), "snapshot written");

        Ok(BackupEntry {
            file_name,
            timestamp: Timestamp::new(stamp),
            path,
        })
    }

    /// Deletes the oldest snapshots of `filename`, regular and safety alike,
    /// beyond the retention limit. Returns how many were deleted.
    ///
    /// Files whose names carry no stamp were not written here and are left
    /// alone.
    pub fn prune(&self, filename: &str) -> CoreResult<usize> {
        validate_name(filename)?;
        let base = base_name(filename);

        let mut owned: Vec<(Timestamp, String)> = list_files(&self.dir)?
            .into_iter()
            .filter_map(|name| {
                let stamp = snapshot_suffix(base, &name).and_then(parse_snapshot_stamp)?;
                Some((stamp, name))
            })
            .collect();

        if owned.len() <= self.max_backups {
            return Ok(0);
        }

        owned.sort();
        let excess = owned.len() - self.max_backups;
        let mut deleted = 0;
        for (_, name) in owned.into_iter().take(excess) {
            if remove_if_exists(&self.dir.join(&name))? {
                deleted += 1;
            }
        }
        debug!(collection = filename, deleted, "pruned snapshots");
        Ok(deleted)
    }

    /// Lists the snapshots of `filename`, newest first.
    ///
    /// Names of the form `<base>_<anything>.json` that carry no stamp are
    /// listed with timestamp zero, so they sort last.
    pub fn list(&self, filename: &str) -> CoreResult<Vec<BackupEntry>> {
        validate_name(filename)?;
        let base = base_name(filename);

        let mut entries: Vec<BackupEntry> = list_files(&self.dir)?
            .into_iter()
            .filter_map(|name| {
                let suffix = snapshot_suffix(base, &name)?;
                let timestamp = parse_snapshot_stamp(suffix).unwrap_or(Timestamp::new(0));
                Some(BackupEntry {
                    path: self.dir.join(&name),
                    file_name: name,
                    timestamp,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(entries)
    }

    /// Reads a snapshot by file name.
    ///
    /// # Errors
    ///
    /// A missing snapshot is a "not found" I/O error, never an empty result.
    pub fn read(&self, backup_file_name: &str) -> CoreResult<Vec<u8>> {
        validate_name(backup_file_name)?;
        Ok(fs::read(self.dir.join(backup_file_name))?)
    }
}

/// Returns the part of `name` between `<base>_` and `.json`.
fn snapshot_suffix<'a>(base: &str, name: &'a str) -> Option<&'a str> {
    name.strip_prefix(base)?
        .strip_prefix('_')?
        .strip_suffix(COLLECTION_EXT)
}

/// Parses `<digits>` or `restore_backup_<digits>`.
fn parse_snapshot_stamp(suffix: &str) -> Option<Timestamp> {
    let digits = match suffix.strip_prefix(RESTORE_INFIX) {
        Some(rest) => rest.strip_prefix('_')?,
        None => suffix,
    };
    parse_stamp(digits)
}

fn parse_stamp(suffix: &str) -> Option<Timestamp> {
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok().map(Timestamp::new)
}
