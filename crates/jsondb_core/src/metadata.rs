//! Per-collection metadata sidecars.
//!
//! The sidecar for `notices.json` is `<metadata_dir>/notices.meta.json`.
//! It records provenance, never data, so a missing or unreadable sidecar is
//! an empty record rather than an error.

use crate::dir::{base_name, validate_name, METADATA_SUFFIX};
use crate::error::CoreResult;
use crate::types::Timestamp;
use jsondb_storage::AtomicFile;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata record of one collection.
///
/// Unknown fields written by other tools are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileMetadata {
    /// When the collection was first written. Set once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    /// When the collection was last written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// When the last snapshot of the collection was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<Timestamp>,

    /// Store-managed version counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,

    /// File name of the last snapshot taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file_name: Option<String>,

    /// Snapshot the collection was last restored from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<String>,

    /// Fields not known to the store.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileMetadata {
    /// Shallow-merges `partial` over `self`: every field present in
    /// `partial` replaces the one in `self`.
    pub fn merge(&mut self, partial: FileMetadata) {
        let FileMetadata {
            created,
            last_modified,
            last_backup,
            version,
            backup_file_name,
            restored_from,
            extra,
        } = partial;

        if created.is_some() {
            self.created = created;
        }
        if last_modified.is_some() {
            self.last_modified = last_modified;
        }
        if last_backup.is_some() {
            self.last_backup = last_backup;
        }
        if version.is_some() {
            self.version = version;
        }
        if backup_file_name.is_some() {
            self.backup_file_name = backup_file_name;
        }
        if restored_from.is_some() {
            self.restored_from = restored_from;
        }
        for (key, value) in extra {
            self.extra.insert(key, value);
        }
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reads and updates metadata sidecars.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    /// Creates a store over `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the metadata directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the sidecar path for a collection.
    pub fn path(&self, filename: &str) -> CoreResult<PathBuf> {
        validate_name(filename)?;
        Ok(self
            .dir
            .join(format!("{}{METADATA_SUFFIX}", base_name(filename))))
    }

    /// Reads the metadata of a collection.
    ///
    /// Returns an empty record if the sidecar is absent or unreadable.
    pub fn read(&self, filename: &str) -> CoreResult<FileMetadata> {
        let path = self.path(filename)?;
        let Some(data) = AtomicFile::new(&path).read()? else {
            return Ok(FileMetadata::default());
        };
        match serde_json::from_slice(&data) {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring unreadable metadata");
                Ok(FileMetadata::default())
            }
        }
    }

    /// Merges `partial` into the stored record and persists the result.
    ///
    /// If the stored record already had a version, the result's version is
    /// exactly one more, whatever `partial` says. Otherwise the version is
    /// whatever `partial` carries, possibly none.
    pub fn update(&self, filename: &str, partial: FileMetadata) -> CoreResult<FileMetadata> {
        let mut metadata = self.read(filename)?;
        let previous_version = metadata.version;

        metadata.merge(partial);
        if let Some(version) = previous_version {
            metadata.version = Some(version.saturating_add(1));
        }

        let path = self.path(filename)?;
        AtomicFile::new(path).write(&serde_json::to_vec_pretty(&metadata)?)?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn read_missing_is_empty() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        assert!(store.read("notices.json").unwrap().is_empty());
    }

    #[test]
    fn sidecar_name() {
        let store = MetadataStore::new("/data/metadata");
        assert_eq!(
            store.path("notices.json").unwrap(),
            PathBuf::from("/data/metadata/notices.meta.json")
        );
    }

    #[test]
    fn update_merges_shallowly() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        store
            .update(
                "a.json",
                FileMetadata {
                    created: Some(Timestamp::new(1)),
                    last_modified: Some(Timestamp::new(1)),
                    ..FileMetadata::default()
                },
            )
            .unwrap();
        let merged = store
            .update(
                "a.json",
                FileMetadata {
                    last_modified: Some(Timestamp::new(2)),
                    ..FileMetadata::default()
                },
            )
            .unwrap();

        assert_eq!(merged.created, Some(Timestamp::new(1)));
        assert_eq!(merged.last_modified, Some(Timestamp::new(2)));
        assert_eq!(store.read("a.json").unwrap(), merged);
    }

    #[test]
    fn version_absent_until_seeded() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        let first = store.update("a.json", FileMetadata::default()).unwrap();
        assert_eq!(first.version, None);
        let second = store.update("a.json", FileMetadata::default()).unwrap();
        assert_eq!(second.version, None);
    }

    #[test]
    fn version_increments_by_one_regardless_of_partial() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        let seeded = store
            .update(
                "a.json",
                FileMetadata {
                    version: Some(1),
                    ..FileMetadata::default()
                },
            )
            .unwrap();
        assert_eq!(seeded.version, Some(1));

        let bumped = store.update("a.json", FileMetadata::default()).unwrap();
        assert_eq!(bumped.version, Some(2));

        let ignored = store
            .update(
                "a.json",
                FileMetadata {
                    version: Some(100),
                    ..FileMetadata::default()
                },
            )
            .unwrap();
        assert_eq!(ignored.version, Some(3));
    }

    #[test]
    fn on_disk_format_is_camel_case() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        store
            .update(
                "a.json",
                FileMetadata {
                    last_modified: Some(Timestamp::new(5)),
                    backup_file_name: Some("a_4.json".into()),
                    ..FileMetadata::default()
                },
            )
            .unwrap();

        let raw: Value =
            serde_json::from_slice(&fs::read(dir.path().join("a.meta.json")).unwrap()).unwrap();
        assert_eq!(raw, json!({ "lastModified": 5, "backupFileName": "a_4.json" }));
    }

    #[test]
    fn unknown_fields_survive_updates() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.meta.json"),
            r#"{"owner":"ops","created":7}"#,
        )
        .unwrap();
        let store = MetadataStore::new(dir.path());

        let updated = store
            .update(
                "a.json",
                FileMetadata {
                    last_modified: Some(Timestamp::new(9)),
                    ..FileMetadata::default()
                },
            )
            .unwrap();

        assert_eq!(updated.created, Some(Timestamp::new(7)));
        assert_eq!(updated.extra.get("owner"), Some(&json!("ops")));
    }

    #[test]
    fn unreadable_sidecar_is_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.meta.json"), "{ nope").unwrap();
        let store = MetadataStore::new(dir.path());

        assert!(store.read("a.json").unwrap().is_empty());
    }

    #[test]
    fn version_saturates_instead_of_overflowing() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        fs::write(
            store.path("a.json").unwrap(),
            format!(r#"{{"version": {}}}"#, u64::MAX),
        )
        .unwrap();

        let updated = store.update("a.json", FileMetadata::default()).unwrap();
        assert_eq!(updated.version, Some(u64::MAX));
    }
}
