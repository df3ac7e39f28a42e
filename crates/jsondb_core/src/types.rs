//! Core type definitions for JsonDB.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A record stored in a collection.
///
/// Items are plain JSON objects. Field order is preserved.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Default name of the identifier field of an [`Item`].
pub const DEFAULT_ID_FIELD: &str = "id";

/// Wall-clock time in milliseconds since the Unix epoch.
///
/// Used for lock stamps, snapshot names, and metadata fields. Not monotonic:
/// two hosts (or one host after a clock step) may disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Creates a timestamp from raw milliseconds.
    #[must_use]
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub const fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of checking a collection file against its checksum sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValidation {
    /// Whether the collection file exists.
    pub exists: bool,
    /// Whether its content matches the recorded checksum.
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_ordering() {
        let a = Timestamp::new(100);
        let b = Timestamp::new(250);
        assert!(a < b);
        assert_eq!(b.millis_since(a), 150);
        assert_eq!(a.millis_since(b), 0);
    }

    #[test]
    fn timestamp_serializes_as_number() {
        let json = serde_json::to_string(&Timestamp::new(1_700_000_000_000)).unwrap();
        assert_eq!(json, "1700000000000");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(Timestamp::now().as_millis() > 1_577_836_800_000);
    }
}
