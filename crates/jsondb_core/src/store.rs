//! The store: owns the data directory and runs the write pipeline.
//!
//! Every write of a collection file goes through the same sequence while
//! holding the collection's lock:
//!
//! 1. read the previous bytes
//! 2. snapshot them and prune old snapshots (best effort)
//! 3. serialize the new document once
//! 4. write the checksum sidecar from that buffer, then atomically replace
//!    the collection file with the same buffer
//! 5. update the metadata sidecar (best effort)
//!
//! Reads do not lock. Because replacement is an atomic rename, an unlocked
//! reader sees either the previous or the new file in full.

use crate::backup::{BackupEntry, BackupManager};
use crate::checksum;
use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::dir::DataDir;
use crate::error::CoreResult;
use crate::lock::{LockGuard, LockManager};
use crate::metadata::{FileMetadata, MetadataStore};
use crate::types::{FileValidation, Timestamp};
use jsondb_storage::AtomicFile;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// A file-based JSON collection store.
///
/// `JsonStore` is `Send + Sync`; share it across threads with an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use jsondb_core::{JsonStore, StoreConfig};
/// use serde_json::json;
///
/// let store = JsonStore::open(StoreConfig::new("data"))?;
/// let notices = store.collection("notices.json");
///
/// notices.save_item(item(json!({ "id": "notice_1", "title": "T" })))?;
/// let all: Vec<serde_json::Value> = notices.read_items()?;
/// ```
#[derive(Debug)]
pub struct JsonStore {
    config: StoreConfig,
    dir: DataDir,
    locks: LockManager,
    backups: BackupManager,
    metadata: MetadataStore,
}

impl JsonStore {
    /// Opens a store, creating the data directory if needed.
    pub fn open(config: StoreConfig) -> CoreResult<Self> {
        let dir = DataDir::open(&config)?;
        let locks = LockManager::new(config.lock);
        let backups = BackupManager::new(dir.backup_dir(), config.max_backups);
        let metadata = MetadataStore::new(dir.metadata_dir());

        debug!(data_dir = %dir.path().display(), "store opened");
        Ok(Self {
            config,
            dir,
            locks,
            backups,
            metadata,
        })
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the resolved directory layout.
    #[must_use]
    pub fn dir(&self) -> &DataDir {
        &self.dir
    }

    /// Returns the lock manager.
    #[must_use]
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Returns a handle on a collection file (e.g. `"notices.json"`).
    ///
    /// Nothing is read or created until an operation runs.
    pub fn collection(&self, filename: impl Into<String>) -> Collection<'_> {
        Collection::new(self, filename.into())
    }

    /// Lists the collection files in the data directory.
    pub fn list_collections(&self) -> CoreResult<Vec<String>> {
        self.dir.list_collections()
    }

    /// Reads a collection file as raw JSON, without any self-healing.
    ///
    /// Returns `None` if the file does not exist.
    pub fn read_json_file(&self, filename: &str) -> CoreResult<Option<Value>> {
        let path = self.dir.collection_path(filename)?;
        match AtomicFile::new(path).read()? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Replaces a collection file with `document` through the full write
    /// pipeline (lock, snapshot, checksum, metadata).
    pub fn write_json_file(&self, filename: &str, document: &Value) -> CoreResult<()> {
        let path = self.dir.collection_path(filename)?;
        let _guard = self.lock(&path)?;
        self.write_locked(filename, &path, document)
    }

    /// Checks a collection file against its checksum sidecar.
    pub fn validate_file(&self, filename: &str) -> CoreResult<FileValidation> {
        checksum::verify(&self.dir.collection_path(filename)?)
    }

    /// Validates every collection in the data directory.
    pub fn validate_all(&self) -> CoreResult<Vec<(String, FileValidation)>> {
        self.list_collections()?
            .into_iter()
            .map(|name| {
                let validation = self.validate_file(&name)?;
                Ok((name, validation))
            })
            .collect()
    }

    /// Reads the metadata sidecar of a collection. Absent is empty.
    pub fn read_file_metadata(&self, filename: &str) -> CoreResult<FileMetadata> {
        self.metadata.read(filename)
    }

    /// Merges `partial` into a collection's metadata under its lock.
    ///
    /// See [`MetadataStore::update`] for the version rule.
    pub fn update_file_metadata(
        &self,
        filename: &str,
        partial: FileMetadata,
    ) -> CoreResult<FileMetadata> {
        let path = self.dir.collection_path(filename)?;
        let _guard = self.lock(&path)?;
        self.metadata.update(filename, partial)
    }

    /// Lists a collection's snapshots, newest first.
    pub fn list_file_backups(&self, filename: &str) -> CoreResult<Vec<BackupEntry>> {
        self.backups.list(filename)
    }

    /// Replaces a collection with one of its snapshots.
    ///
    /// The current content is first kept as a `*_restore_backup_*` safety
    /// snapshot (unless disabled in the config), which counts towards the
    /// snapshot limit like any other. Metadata records
    /// `restoredFrom` and the version is bumped (seeded to 1 if absent).
    ///
    /// # Errors
    ///
    /// A missing snapshot fails with a "not found" I/O error before anything
    /// is modified.
    pub fn restore_from_backup(&self, filename: &str, backup_file_name: &str) -> CoreResult<()> {
        let path = self.dir.collection_path(filename)?;
        let guard = self.lock(&path)?;

        let data = self.backups.read(backup_file_name)?;
        let now = Timestamp::now();

        if self.config.restore_safety_snapshot {
            if let Some(current) = AtomicFile::new(&path).read()? {
                let safety = self.backups.safety_snapshot(filename, &current, now)?;
                debug!(collection = filename, snapshot = %safety.file_name, "safety snapshot taken");
                if let Err(e) = self.backups.prune(filename) {
                    warn!(collection = filename, error = %e, "failed to prune snapshots");
                }
            }
        }
        guard.renew()?;

        checksum::write(&path, &data)?;
        AtomicFile::new(&path).write(&data)?;

        self.metadata.update(
            filename,
            FileMetadata {
                last_modified: Some(now),
                restored_from: Some(backup_file_name.to_string()),
                version: Some(1),
                ..FileMetadata::default()
            },
        )?;

        info!(collection = filename, backup = backup_file_name, "collection restored");
        Ok(())
    }

    pub(crate) fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub(crate) fn lock(&self, path: &Path) -> CoreResult<LockGuard> {
        self.locks.acquire(path)
    }

    /// Runs the write pipeline. The caller must hold the lock on `path`.
    pub(crate) fn write_locked(
        &self,
        filename: &str,
        path: &Path,
        document: &Value,
    ) -> CoreResult<()> {
        let file = AtomicFile::new(path);
        let previous = file.read()?;
        let now = Timestamp::now();

        let snapshot = match previous.as_deref() {
            Some(prev) => self.take_snapshot(filename, prev, now),
            None => None,
        };

        let data = serde_json::to_vec_pretty(document)?;
        checksum::write(path, &data)?;
        file.write(&data)?;

        let mut partial = FileMetadata {
            last_modified: Some(now),
            ..FileMetadata::default()
        };
        if let Some(entry) = snapshot {
            partial.last_backup = Some(now);
            partial.backup_file_name = Some(entry.file_name);
        }
        if let Err(e) = self.record_write(filename, partial, now) {
            warn!(collection = filename, error = %e, "failed to update metadata");
        }

        debug!(collection = filename, bytes = data.len(), "collection written");
        Ok(())
    }

    /// Snapshots and prunes. Failures are logged and swallowed so they never
    /// block the primary write.
    fn take_snapshot(&self, filename: &str, previous: &[u8], now: Timestamp) -> Option<BackupEntry> {
        let entry = match self.backups.snapshot(filename, previous, now) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(collection = filename, error = %e, "failed to snapshot previous content");
                None
            }
        };
        if let Err(e) = self.backups.prune(filename) {
            warn!(collection = filename, error = %e, "failed to prune snapshots");
        }
        entry
    }

    fn record_write(
        &self,
        filename: &str,
        mut partial: FileMetadata,
        now: Timestamp,
    ) -> CoreResult<()> {
        if self.metadata.read(filename)?.created.is_none() {
            partial.created = Some(now);
        }
        self.metadata.update(filename, partial)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn open(root: &Path) -> JsonStore {
        JsonStore::open(StoreConfig::new(root)).unwrap()
    }

    #[test]
    fn first_write_has_no_snapshot() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!([1])).unwrap();

        assert!(store.list_file_backups("a.json").unwrap().is_empty());
        let meta = store.read_file_metadata("a.json").unwrap();
        assert!(meta.created.is_some());
        assert_eq!(meta.created, meta.last_modified);
        assert_eq!(meta.last_backup, None);
        assert_eq!(meta.version, None);
    }

    #[test]
    fn overwrite_snapshots_previous_bytes() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!([1])).unwrap();
        let first_bytes = fs::read(temp.path().join("a.json")).unwrap();
        store.write_json_file("a.json", &json!([2])).unwrap();

        let backups = store.list_file_backups("a.json").unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read(&backups[0].path).unwrap(), first_bytes);

        let meta = store.read_file_metadata("a.json").unwrap();
        assert_eq!(meta.backup_file_name.as_deref(), Some(backups[0].file_name.as_str()));
        assert!(meta.last_backup.is_some());
    }

    #[test]
    fn created_is_set_once() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!([])).unwrap();
        let created = store.read_file_metadata("a.json").unwrap().created;
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.write_json_file("a.json", &json!([1])).unwrap();

        let meta = store.read_file_metadata("a.json").unwrap();
        assert_eq!(meta.created, created);
        assert!(meta.last_modified > created);
    }

    #[test]
    fn writes_keep_checksum_in_sync() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        for i in 0..3 {
            store.write_json_file("a.json", &json!([i])).unwrap();
            assert!(store.validate_file("a.json").unwrap().valid);
        }
        assert!(!temp.path().join("a.json.lock").exists());
    }

    #[test]
    fn written_json_is_pretty() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!([{ "id": 1 }])).unwrap();
        let text = fs::read_to_string(temp.path().join("a.json")).unwrap();
        assert_eq!(text, "[\n  {\n    \"id\": 1\n  }\n]");
    }

    #[test]
    fn snapshot_failure_does_not_block_write() {
        let temp = tempdir().unwrap();
        // A regular file where the backup directory should be.
        fs::write(temp.path().join("backups"), b"in the way").unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!([1])).unwrap();
        store.write_json_file("a.json", &json!([2])).unwrap();

        assert_eq!(store.read_json_file("a.json").unwrap(), Some(json!([2])));
        assert!(store.read_file_metadata("a.json").unwrap().last_backup.is_none());
    }

    #[test]
    fn restore_from_backup_replaces_content() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!(["v1"])).unwrap();
        store.write_json_file("a.json", &json!(["v2"])).unwrap();
        let snapshot = store.list_file_backups("a.json").unwrap().remove(0);

        store.restore_from_backup("a.json", &snapshot.file_name).unwrap();

        assert_eq!(store.read_json_file("a.json").unwrap(), Some(json!(["v1"])));
        assert!(store.validate_file("a.json").unwrap().valid);

        let meta = store.read_file_metadata("a.json").unwrap();
        assert_eq!(meta.restored_from.as_deref(), Some(snapshot.file_name.as_str()));
        assert_eq!(meta.version, Some(1));

        let names: Vec<String> = store
            .list_file_backups("a.json")
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect();
        assert!(names.iter().any(|n| n.starts_with("a_restore_backup_")));
    }

    #[test]
    fn repeated_restores_stay_within_retention() {
        let temp = tempdir().unwrap();
        let store = JsonStore::open(StoreConfig::new(temp.path()).max_backups(2)).unwrap();

        for n in 0..5 {
            store.write_json_file("a.json", &json!([n])).unwrap();
        }
        for _ in 0..6 {
            let newest = store.list_file_backups("a.json").unwrap().remove(0);
            store.restore_from_backup("a.json", &newest.file_name).unwrap();
            assert!(store.list_file_backups("a.json").unwrap().len() <= 2);
        }

        assert_eq!(store.list_file_backups("a.json").unwrap().len(), 2);
        assert!(store.validate_file("a.json").unwrap().valid);
    }

    #[test]
    fn restore_bumps_existing_version() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        store.write_json_file("a.json", &json!([1])).unwrap();
        store.write_json_file("a.json", &json!([2])).unwrap();
        let snapshot = store.list_file_backups("a.json").unwrap().remove(0);

        store.restore_from_backup("a.json", &snapshot.file_name).unwrap();
        store.restore_from_backup("a.json", &snapshot.file_name).unwrap();

        assert_eq!(store.read_file_metadata("a.json").unwrap().version, Some(2));
    }

    #[test]
    fn restore_from_missing_backup_fails_loudly() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());
        store.write_json_file("a.json", &json!([1])).unwrap();
        let before = fs::read(temp.path().join("a.json")).unwrap();

        let err = store.restore_from_backup("a.json", "a_1.json").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(fs::read(temp.path().join("a.json")).unwrap(), before);
        assert!(!temp.path().join("a.json.lock").exists());
    }

    #[test]
    fn restore_without_safety_snapshot() {
        let temp = tempdir().unwrap();
        let store =
            JsonStore::open(StoreConfig::new(temp.path()).restore_safety_snapshot(false)).unwrap();

        store.write_json_file("a.json", &json!([1])).unwrap();
        store.write_json_file("a.json", &json!([2])).unwrap();
        let snapshot = store.list_file_backups("a.json").unwrap().remove(0);
        store.restore_from_backup("a.json", &snapshot.file_name).unwrap();

        assert_eq!(store.list_file_backups("a.json").unwrap().len(), 1);
    }

    #[test]
    fn update_file_metadata_merges() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        let mut partial = FileMetadata::default();
        partial.extra.insert("owner".into(), json!("ops"));
        store.update_file_metadata("a.json", partial).unwrap();

        let meta = store.read_file_metadata("a.json").unwrap();
        assert_eq!(meta.extra.get("owner"), Some(&json!("ops")));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        assert!(store.write_json_file("../escape.json", &json!([])).is_err());
        assert!(store.validate_file("a/b.json").is_err());
    }
}
