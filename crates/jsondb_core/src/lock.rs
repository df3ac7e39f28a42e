//! Advisory per-file locking with sentinel marker files.
//!
//! A lock on `<dir>/notices.json` is the marker `<dir>/notices.json.lock`.
//! The marker is created with create-exclusive semantics and holds the
//! epoch-millisecond time of acquisition (or of the last lease renewal) as
//! plain text.
//!
//! ## Acquisition
//!
//! 1. Try to create the marker exclusively.
//! 2. If it exists and the caller has waited less than the timeout, sleep
//!    for the retry interval and try again.
//! 3. Past the timeout, break the marker if its lease has expired and retry
//!    immediately; otherwise fail with [`CoreError::LockTimeout`].
//! 4. If the marker's directory does not exist yet, create it and retry.
//!
//! ## Leases
//!
//! Holders inside this process are tracked in a process-wide registry with
//! a monotonic (`Instant`) expiry, so a waiter in the same process never
//! breaks a live holder's lock because of a wall-clock jump. Holders doing
//! long work call [`LockGuard::renew`]. For markers created by other
//! processes only the wall-clock stamp in the marker is available, so clock
//! skew between processes can still cause a premature break.
//!
//! This is single-host, advisory locking. It assumes a filesystem with
//! atomic exclusive create and provides no distributed consensus.

use crate::config::LockConfig;
use crate::error::{CoreError, CoreResult};
use crate::types::Timestamp;
use parking_lot::{const_mutex, Mutex};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Suffix appended to a file path to form its lock marker.
pub const LOCK_SUFFIX: &str = ".lock";

/// Live leases held by this process, keyed by marker path.
static LEASES: Mutex<BTreeMap<PathBuf, Lease>> = const_mutex(BTreeMap::new());

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: u64,
    expires: Instant,
}

/// Returns the marker path guarding `path`.
#[must_use]
pub fn marker_path(path: &Path) -> PathBuf {
    let mut marker = OsString::from(path.as_os_str());
    marker.push(LOCK_SUFFIX);
    PathBuf::from(marker)
}

/// Acquires and releases advisory locks.
#[derive(Debug, Clone)]
pub struct LockManager {
    config: LockConfig,
}

impl LockManager {
    /// Creates a lock manager with the given timing.
    #[must_use]
    pub fn new(config: LockConfig) -> Self {
        Self { config }
    }

    /// Returns the timing configuration.
    #[must_use]
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Blocks until the lock on `path` is held or the timeout passes.
    ///
    /// The returned guard releases the lock when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockTimeout`] if a live holder kept the lock past
    /// the timeout, or an I/O error if the marker can't be created at all.
    pub fn acquire(&self, path: &Path) -> CoreResult<LockGuard> {
        let marker = marker_path(path);
        let started = Instant::now();

        loop {
            match create_marker(&marker) {
                Ok(()) => {
                    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
                    LEASES.lock().insert(
                        marker.clone(),
                        Lease {
                            token,
                            expires: Instant::now() + self.config.stale_after,
                        },
                    );
                    debug!(marker = %marker.display(), waited = ?started.elapsed(), "lock acquired");
                    return Ok(LockGuard {
                        marker,
                        token,
                        stale_after: self.config.stale_after,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let waited = started.elapsed();
                    if waited <= self.config.timeout {
                        thread::sleep(self.config.retry_interval);
                        continue;
                    }
                    if self.is_stale(&marker) {
                        warn!(marker = %marker.display(), "breaking stale lock");
                        LEASES.lock().remove(&marker);
                        match fs::remove_file(&marker) {
                            Ok(()) => {}
                            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                            Err(e) => return Err(e.into()),
                        }
                        continue;
                    }
                    return Err(CoreError::lock_timeout(path, waited));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    let parent = marker.parent().ok_or_else(|| {
                        CoreError::invalid_name(marker.to_string_lossy().into_owned())
                    })?;
                    fs::create_dir_all(parent)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Removes the lock on `path` regardless of who holds it.
    ///
    /// Idempotent: a missing marker is not an error.
    pub fn release(&self, path: &Path) -> CoreResult<()> {
        let marker = marker_path(path);
        LEASES.lock().remove(&marker);
        remove_marker(&marker)
    }

    /// Returns true if the lock on `path` is currently held by anyone.
    #[must_use]
    pub fn is_locked(&self, path: &Path) -> bool {
        marker_path(path).exists()
    }

    /// Decides whether the holder of `marker` has abandoned it.
    fn is_stale(&self, marker: &Path) -> bool {
        if let Some(lease) = LEASES.lock().get(marker) {
            return Instant::now() >= lease.expires;
        }

        let stamp = match read_stamp(marker) {
            Ok(Some(stamp)) => stamp,
            Ok(None) => return true,
            Err(e) => {
                debug!(marker = %marker.display(), error = %e, "unreadable lock marker");
                return true;
            }
        };
        let age = Timestamp::now().millis_since(stamp);
        age > u64::try_from(self.config.stale_after.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

/// An acquired lock. Dropping the guard releases it.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    marker: PathBuf,
    token: u64,
    stale_after: Duration,
    released: bool,
}

impl LockGuard {
    /// Returns the marker file path.
    #[must_use]
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Extends the lease and refreshes the marker stamp.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LeaseLost`] if the lease expired and another
    /// holder broke the lock in the meantime.
    pub fn renew(&self) -> CoreResult<()> {
        {
            let mut leases = LEASES.lock();
            match leases.get_mut(&self.marker) {
                Some(lease) if lease.token == self.token => {
                    lease.expires = Instant::now() + self.stale_after;
                }
                _ => {
                    return Err(CoreError::LeaseLost {
                        path: self.marker.clone(),
                    })
                }
            }
        }
        fs::write(&self.marker, Timestamp::now().to_string())?;
        Ok(())
    }

    /// Releases the lock now, reporting any error.
    pub fn release(mut self) -> CoreResult<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> CoreResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let owned = {
            let mut leases = LEASES.lock();
            match leases.get(&self.marker) {
                Some(lease) if lease.token == self.token => {
                    leases.remove(&self.marker);
                    true
                }
                _ => false,
            }
        };
        // Someone broke our lease and may hold the marker now.
        if !owned {
            warn!(marker = %self.marker.display(), "lease was broken before release");
            return Ok(());
        }
        debug!(marker = %self.marker.display(), "lock released");
        remove_marker(&self.marker)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            warn!(marker = %self.marker.display(), error = %e, "failed to release lock");
        }
    }
}

fn create_marker(marker: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(marker)?;
    file.write_all(Timestamp::now().to_string().as_bytes())?;
    Ok(())
}

fn remove_marker(marker: &Path) -> CoreResult<()> {
    match fs::remove_file(marker) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Reads the stamp of a foreign marker, falling back to its mtime.
///
/// `Ok(None)` means the marker vanished.
fn read_stamp(marker: &Path) -> io::Result<Option<Timestamp>> {
    let text = match fs::read_to_string(marker) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if let Ok(millis) = text.trim().parse::<u64>() {
        return Ok(Some(Timestamp::new(millis)));
    }

    // Half-written marker: its mtime is the best evidence of age.
    let modified = fs::metadata(marker)?.modified()?;
    let millis = modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(Some(Timestamp::new(u64::try_from(millis).unwrap_or(0))))
}
