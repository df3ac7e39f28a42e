//! # JsonDB Storage
//!
//! Atomic file primitives for JsonDB.
//!
//! This crate is the lowest layer of JsonDB. It moves **opaque bytes**
//! between memory and the filesystem and never interprets them.
//!
//! ## Design Principles
//!
//! - Whole-file reads and writes only
//! - Replacement is atomic: temp file, fsync, rename, directory fsync
//! - A missing file is a value (`None`), not an error
//! - JsonDB owns all format interpretation (JSON, checksums, metadata)
//!
//! ## Example
//!
//! ```rust
//! use jsondb_storage::AtomicFile;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = AtomicFile::new(dir.path().join("data.json"));
//! assert!(file.read().unwrap().is_none());
//!
//! file.write(b"[]").unwrap();
//! assert_eq!(file.read().unwrap().as_deref(), Some(&b"[]"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dir;
mod error;
mod file;

pub use dir::{copy_file, list_dirs, list_files, remove_if_exists, sync_directory};
pub use error::{StorageError, StorageResult};
pub use file::{AtomicFile, TEMP_SUFFIX};
