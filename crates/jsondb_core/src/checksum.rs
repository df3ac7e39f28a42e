//! Content checksums for collection files.
//!
//! Each collection file `x.json` has a sidecar `x.json.checksum` holding the
//! lowercase hex SHA-256 of the file's exact bytes. The sidecar is written
//! from the same in-memory buffer as the data file, so after any successful
//! write `sidecar == sha256(file)`. A mismatch means the file was changed
//! behind the store's back or a write crashed between the two renames.
//!
//! Verification is diagnostic: reads never enforce it.

use crate::error::CoreResult;
use crate::types::FileValidation;
use jsondb_storage::AtomicFile;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to a file path to form its checksum sidecar.
pub const CHECKSUM_SUFFIX: &str = ".checksum";

/// Computes the hex SHA-256 digest of `data`.
#[must_use]
pub fn compute(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Returns the sidecar path for `path`.
#[must_use]
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut sidecar = OsString::from(path.as_os_str());
    sidecar.push(CHECKSUM_SUFFIX);
    PathBuf::from(sidecar)
}

/// Writes the sidecar for `path`, describing `data`.
pub fn write(path: &Path, data: &[u8]) -> CoreResult<()> {
    AtomicFile::new(checksum_path(path)).write(compute(data).as_bytes())?;
    Ok(())
}

/// Checks `path` against its sidecar.
///
/// - Missing file: `{ exists: false, valid: false }`.
/// - Sidecar present: valid iff the digests match.
/// - Sidecar missing: valid iff the content parses as JSON. Such files
///   predate checksumming or were placed by hand.
pub fn verify(path: &Path) -> CoreResult<FileValidation> {
    let Some(data) = AtomicFile::new(path).read()? else {
        return Ok(FileValidation {
            exists: false,
            valid: false,
        });
    };

    let valid = match AtomicFile::new(checksum_path(path)).read()? {
        Some(recorded) => String::from_utf8_lossy(&recorded).trim() == compute(&data),
        None => serde_json::from_slice::<serde_json::Value>(&data).is_ok(),
    };

    Ok(FileValidation {
        exists: true,
        valid,
    })
}
