//! Full-system backups ("archives") of the data directory.
//!
//! ## Archive Format
//!
//! ```text
//! <archive_dir>/<name>/
//! ├─ backup-info.json          # manifest, written last
//! ├─ notices.json              # verbatim collection files
//! ├─ users.json
//! └─ metadata/
//!    └─ notices.meta.json      # metadata sidecars that existed
//! ```
//!
//! The manifest is written after every file has been copied, so an archive
//! without one is incomplete. Archives are never modified after creation.
//! Collection locks are not taken while archiving: each file is read whole,
//! and atomic replacement guarantees that read sees one complete version.

use crate::checksum;
use crate::dir::{base_name, validate_name, METADATA_SUFFIX};
use crate::error::{CoreError, CoreResult};
use crate::store::JsonStore;
use jsondb_storage::{copy_file, list_dirs, AtomicFile};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Name of the manifest inside an archive.
pub const MANIFEST_FILE: &str = "backup-info.json";

/// Sub-directory of an archive holding metadata sidecars.
const ARCHIVE_METADATA_DIR: &str = "metadata";

/// Prefix of the archive taken automatically before a restore.
const SAFETY_PREFIX: &str = "pre-restore";

/// Manifest of an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveManifest {
    /// RFC 3339 creation time (UTC).
    pub created_at: String,
    /// Number of collection files in the archive.
    pub file_count: usize,
    /// Collection file names in the archive.
    pub files: Vec<String>,
}

/// Result of [`JsonStore::create_full_backup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullBackup {
    /// Directory of the new archive.
    pub backup_path: PathBuf,
    /// Collection files copied into it.
    pub backed_up_files: Vec<String>,
}

/// One entry of [`JsonStore::list_scheduled_backups`].
///
/// Archives without a readable manifest are still listed, with `None` in
/// place of the manifest values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    /// Archive name.
    pub name: String,
    /// Creation time from the manifest.
    pub created_at: Option<String>,
    /// File count from the manifest.
    pub file_count: Option<usize>,
}

/// Result of [`JsonStore::restore_from_scheduled_backup`].
///
/// A failed restore is not rolled back: `restored_files` lists exactly the
/// collections that were overwritten before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullRestore {
    /// Whether every archived file was restored.
    pub success: bool,
    /// Collections overwritten from the archive, in order.
    pub restored_files: Vec<String>,
    /// What stopped the restore, if it stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FullRestore {
    fn failed(restored_files: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            restored_files,
            error: Some(error.into()),
        }
    }
}

impl JsonStore {
    /// Copies every collection and its metadata into a new archive.
    ///
    /// Without a name, one is derived from the current UTC time
    /// (`backup-2024-05-01T10-20-30-123Z`), with a `-N` suffix if that is
    /// taken.
    ///
    /// # Errors
    ///
    /// [`CoreError::ArchiveExists`] if an explicit `name` is already used.
    pub fn create_full_backup(&self, name: Option<&str>) -> CoreResult<FullBackup> {
        let archive = match name {
            Some(name) => {
                let path = self.dir().archive_path(name)?;
                if path.exists() {
                    return Err(CoreError::archive_exists(name));
                }
                path
            }
            None => self.unique_archive_path("backup")?,
        };
        self.write_archive(&archive)
    }

    /// Lists archives, newest first. Archives lacking a manifest sort last.
    pub fn list_scheduled_backups(&self) -> CoreResult<Vec<ArchiveSummary>> {
        let mut summaries: Vec<ArchiveSummary> = list_dirs(self.dir().archive_dir())?
            .into_iter()
            .map(|name| {
                let manifest = read_manifest(&self.dir().archive_dir().join(&name));
                ArchiveSummary {
                    created_at: manifest.as_ref().map(|m| m.created_at.clone()),
                    file_count: manifest.as_ref().map(|m| m.file_count),
                    name,
                }
            })
            .collect();

        summaries.sort_by(|a, b| match (&a.created_at, &b.created_at) {
            (Some(x), Some(y)) => compare_created(y, x).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(summaries)
    }

    /// Restores every collection recorded in an archive.
    ///
    /// A safety archive of the current state (`pre-restore-...`) is taken
    /// first; if that fails nothing is touched and the error is returned.
    /// A missing archive or manifest yields `success: false` with nothing
    /// restored. Each file is written back under its collection lock with a
    /// fresh checksum, and its metadata is restored when archived. The first
    /// failure stops the restore and is reported with the files restored so
    /// far.
    pub fn restore_from_scheduled_backup(&self, name: &str) -> CoreResult<FullRestore> {
        let archive = self.dir().archive_path(name)?;
        if !archive.is_dir() {
            return Ok(FullRestore::failed(
                Vec::new(),
                format!("archive not found: {name}"),
            ));
        }
        let Some(manifest) = read_manifest(&archive) else {
            return Ok(FullRestore::failed(
                Vec::new(),
                format!("archive {name} has no readable {MANIFEST_FILE}"),
            ));
        };

        let safety = self.write_archive(&self.unique_archive_path(SAFETY_PREFIX)?)?;
        info!(
            archive = name,
            safety = %safety.backup_path.display(),
            "safety archive taken before restore"
        );

        let mut restored = Vec::with_capacity(manifest.files.len());
        for file in &manifest.files {
            if let Err(e) = self.restore_archived_file(&archive, file) {
                warn!(archive = name, file = %file, error = %e, "archive restore stopped");
                return Ok(FullRestore::failed(restored, format!("{file}: {e}")));
            }
            restored.push(file.clone());
        }

        info!(archive = name, files = restored.len(), "archive restored");
        Ok(FullRestore {
            success: true,
            restored_files: restored,
            error: None,
        })
    }

    fn restore_archived_file(&self, archive: &Path, file: &str) -> CoreResult<()> {
        validate_name(file)?;
        let path = self.dir().collection_path(file)?;
        let _guard = self.lock(&path)?;

        let data = fs::read(archive.join(file))?;
        checksum::write(&path, &data)?;
        AtomicFile::new(&path).write(&data)?;

        let archived_meta = archive
            .join(ARCHIVE_METADATA_DIR)
            .join(format!("{}{METADATA_SUFFIX}", base_name(file)));
        if archived_meta.is_file() {
            copy_file(&archived_meta, &self.metadata().path(file)?)?;
        }
        Ok(())
    }

    fn write_archive(&self, archive: &Path) -> CoreResult<FullBackup> {
        fs::create_dir_all(archive)?;
        let files = self.list_collections()?;

        for file in &files {
            copy_file(&self.dir().collection_path(file)?, &archive.join(file))?;

            let meta = self.metadata().path(file)?;
            if meta.is_file() {
                let target = archive
                    .join(ARCHIVE_METADATA_DIR)
                    .join(meta.file_name().unwrap_or_default());
                copy_file(&meta, &target)?;
            }
        }

        let manifest = ArchiveManifest {
            created_at: now_rfc3339(),
            file_count: files.len(),
            files: files.clone(),
        };
        AtomicFile::new(archive.join(MANIFEST_FILE))
            .write(&serde_json::to_vec_pretty(&manifest)?)?;

        info!(archive = %archive.display(), files = files.len(), "full backup created");
        Ok(FullBackup {
            backup_path: archive.to_path_buf(),
            backed_up_files: files,
        })
    }

    /// Picks `<prefix>-<utc time>`, adding `-1`, `-2`, ... until unused.
    fn unique_archive_path(&self, prefix: &str) -> CoreResult<PathBuf> {
        let stem = format!("{prefix}-{}", now_compact());
        let mut candidate = self.dir().archive_path(&stem)?;
        let mut n = 1;
        while candidate.exists() {
            candidate = self.dir().archive_path(&format!("{stem}-{n}"))?;
            n += 1;
        }
        Ok(candidate)
    }
}

fn read_manifest(archive: &Path) -> Option<ArchiveManifest> {
    let data = fs::read(archive.join(MANIFEST_FILE)).ok()?;
    serde_json::from_slice(&data).ok()
}

/// RFC 3339 UTC time with exactly three fractional digits.
fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Orders creation times chronologically, falling back to text order for
/// values that do not parse.
fn compare_created(a: &str, b: &str) -> Ordering {
    match (
        OffsetDateTime::parse(a, &Rfc3339),
        OffsetDateTime::parse(b, &Rfc3339),
    ) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// UTC time usable in a directory name: no colons or dots.
fn now_compact() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(format_description!(
        "[year]-[month]-[day]T[hour]-[minute]-[second]-[subsecond digits:3]Z"
    ))
    .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
