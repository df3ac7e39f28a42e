//! Data directory layout.
//!
//! This module maps collection names onto the file system:
//!
//! ```text
//! <data_dir>/
//! ├─ notices.json              # collection file
//! ├─ notices.json.lock         # transient lock marker
//! ├─ notices.json.checksum     # SHA-256 sidecar
//! ├─ backups/notices_<ms>.json # per-write snapshots
//! ├─ metadata/notices.meta.json
//! └─ scheduled-backups/<name>/ # full-system archives
//! ```
//!
//! All names handed in by callers go through [`validate_name`] so that no
//! operation can reach outside its directory.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use jsondb_storage::list_files;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of collection files.
pub const COLLECTION_EXT: &str = ".json";
/// Suffix of metadata sidecars.
pub const METADATA_SUFFIX: &str = ".meta.json";

/// Rejects names that are empty or could escape their directory.
pub fn validate_name(name: &str) -> CoreResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(CoreError::invalid_name(name));
    }
    Ok(())
}

/// Returns the collection name without its `.json` extension.
#[must_use]
pub fn base_name(filename: &str) -> &str {
    filename.strip_suffix(COLLECTION_EXT).unwrap_or(filename)
}

/// Returns true if a data-directory entry is a collection file.
///
/// Lock markers, checksum sidecars, and temp files never end in `.json`;
/// metadata sidecars are excluded explicitly.
#[must_use]
pub fn is_collection_file(name: &str) -> bool {
    name.ends_with(COLLECTION_EXT) && !name.ends_with(METADATA_SUFFIX) && !name.starts_with('.')
}

/// Resolved paths of one store.
#[derive(Debug, Clone)]
pub struct DataDir {
    data: PathBuf,
    backups: PathBuf,
    metadata: PathBuf,
    archives: PathBuf,
    quarantine: PathBuf,
}

impl DataDir {
    /// Resolves the layout from `config`, creating the data directory.
    ///
    /// The other directories are created on first use.
    pub fn open(config: &StoreConfig) -> CoreResult<Self> {
        fs::create_dir_all(&config.data_dir)?;
        if !config.data_dir.is_dir() {
            return Err(CoreError::invalid_name(
                config.data_dir.to_string_lossy().into_owned(),
            ));
        }

        Ok(Self {
            data: config.data_dir.clone(),
            backups: config.backup_dir.clone(),
            metadata: config.metadata_dir.clone(),
            archives: config.archive_dir.clone(),
            quarantine: config.quarantine_dir.clone(),
        })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.data
    }

    /// Returns the snapshot directory.
    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backups
    }

    /// Returns the metadata directory.
    #[must_use]
    pub fn metadata_dir(&self) -> &Path {
        &self.metadata
    }

    /// Returns the archive directory.
    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archives
    }

    /// Returns the quarantine directory.
    #[must_use]
    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine
    }

    /// Returns the path of a collection file.
    pub fn collection_path(&self, filename: &str) -> CoreResult<PathBuf> {
        validate_name(filename)?;
        Ok(self.data.join(filename))
    }

    /// Returns the directory of a named archive.
    pub fn archive_path(&self, name: &str) -> CoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.archives.join(name))
    }

    /// Lists collection files in the data directory, sorted by name.
    pub fn list_collections(&self) -> CoreResult<Vec<String>> {
        let mut names = list_files(&self.data)?;
        names.retain(|name| is_collection_file(name));
        Ok(names)
    }
}
