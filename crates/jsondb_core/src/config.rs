//! Store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory (under the data root) holding per-write snapshots.
pub const BACKUP_DIR: &str = "backups";
/// Directory (under the data root) holding metadata sidecars.
pub const METADATA_DIR: &str = "metadata";
/// Directory (under the data root) holding full-system archives.
pub const ARCHIVE_DIR: &str = "scheduled-backups";
/// Directory (under the data root) receiving quarantined corrupt files.
pub const QUARANTINE_DIR: &str = "quarantine";

/// What `read_items` does with a collection file that is not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptionPolicy {
    /// Treat the collection as empty and rewrite it (the previous bytes
    /// still land in a snapshot). Favors availability.
    #[default]
    Reinitialize,
    /// Move the file into the quarantine directory and return
    /// [`CoreError::Corrupted`](crate::CoreError::Corrupted).
    Quarantine,
}

/// Timing of the advisory lock protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// How long `acquire` waits before giving up (or breaking a stale lock).
    pub timeout: Duration,
    /// Sleep between acquisition attempts.
    pub retry_interval: Duration,
    /// A marker not renewed for this long is considered abandoned.
    pub stale_after: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            retry_interval: Duration::from_millis(100),
            stale_after: Duration::from_millis(10_000),
        }
    }
}

impl LockConfig {
    /// Sets the acquisition timeout.
    #[must_use]
    pub const fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    /// Sets the retry interval.
    #[must_use]
    pub const fn retry_interval(mut self, value: Duration) -> Self {
        self.retry_interval = value;
        self
    }

    /// Sets the staleness threshold.
    #[must_use]
    pub const fn stale_after(mut self, value: Duration) -> Self {
        self.stale_after = value;
        self
    }
}

/// Configuration for opening a [`JsonStore`](crate::JsonStore).
///
/// Every path is explicit so several isolated stores can live in one process.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the collection files.
    pub data_dir: PathBuf,

    /// Directory holding per-write snapshots.
    pub backup_dir: PathBuf,

    /// Directory holding metadata sidecars.
    pub metadata_dir: PathBuf,

    /// Directory holding full-system archives.
    pub archive_dir: PathBuf,

    /// Directory receiving quarantined files.
    pub quarantine_dir: PathBuf,

    /// Snapshots kept per collection before the oldest are pruned.
    pub max_backups: usize,

    /// Lock protocol timing.
    pub lock: LockConfig,

    /// Handling of unparsable collection files on read.
    pub corruption_policy: CorruptionPolicy,

    /// Whether `restore_from_backup` snapshots the current content first.
    pub restore_safety_snapshot: bool,
}

impl StoreConfig {
    /// Default snapshot retention per collection.
    pub const DEFAULT_MAX_BACKUPS: usize = 50;

    /// Creates a configuration rooted at `root` with the standard layout:
    ///
    /// ```text
    /// <root>/
    /// ├─ <collection>.json
    /// ├─ backups/
    /// ├─ metadata/
    /// ├─ scheduled-backups/
    /// └─ quarantine/
    /// ```
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.to_path_buf(),
            backup_dir: root.join(BACKUP_DIR),
            metadata_dir: root.join(METADATA_DIR),
            archive_dir: root.join(ARCHIVE_DIR),
            quarantine_dir: root.join(QUARANTINE_DIR),
            max_backups: Self::DEFAULT_MAX_BACKUPS,
            lock: LockConfig::default(),
            corruption_policy: CorruptionPolicy::default(),
            restore_safety_snapshot: true,
        }
    }

    /// Sets the backup directory.
    #[must_use]
    pub fn backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_dir = path.into();
        self
    }

    /// Sets the metadata directory.
    #[must_use]
    pub fn metadata_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_dir = path.into();
        self
    }

    /// Sets the archive directory.
    #[must_use]
    pub fn archive_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_dir = path.into();
        self
    }

    /// Sets the snapshot retention limit.
    #[must_use]
    pub const fn max_backups(mut self, value: usize) -> Self {
        self.max_backups = value;
        self
    }

    /// Sets the lock acquisition timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, value: Duration) -> Self {
        self.lock.timeout = value;
        self
    }

    /// Replaces the whole lock configuration.
    #[must_use]
    pub const fn lock(mut self, value: LockConfig) -> Self {
        self.lock = value;
        self
    }

    /// Sets the corruption policy.
    #[must_use]
    pub const fn corruption_policy(mut self, value: CorruptionPolicy) -> Self {
        self.corruption_policy = value;
        self
    }

    /// Sets whether restores take a safety snapshot first.
    #[must_use]
    pub const fn restore_safety_snapshot(mut self, value: bool) -> Self {
        self.restore_safety_snapshot = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let config = StoreConfig::new("/srv/data");
        assert_eq!(config.data_dir, Path::new("/srv/data"));
        assert_eq!(config.backup_dir, Path::new("/srv/data/backups"));
        assert_eq!(config.metadata_dir, Path::new("/srv/data/metadata"));
        assert_eq!(config.archive_dir, Path::new("/srv/data/scheduled-backups"));
        assert_eq!(config.max_backups, 50);
        assert_eq!(config.corruption_policy, CorruptionPolicy::Reinitialize);
        assert!(config.restore_safety_snapshot);
    }

    #[test]
    fn default_lock_timing() {
        let lock = LockConfig::default();
        assert_eq!(lock.timeout, Duration::from_millis(5_000));
        assert_eq!(lock.retry_interval, Duration::from_millis(100));
        assert_eq!(lock.stale_after, Duration::from_millis(10_000));
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new("data")
            .max_backups(3)
            .lock_timeout(Duration::from_millis(250))
            .backup_dir("elsewhere/backups")
            .corruption_policy(CorruptionPolicy::Quarantine);

        assert_eq!(config.max_backups, 3);
        assert_eq!(config.lock.timeout, Duration::from_millis(250));
        assert_eq!(config.backup_dir, Path::new("elsewhere/backups"));
        assert_eq!(config.corruption_policy, CorruptionPolicy::Quarantine);
    }
}
