//! # JsonDB Core
//!
//! A file-based JSON collection store for embedding in applications that
//! have no database server.
//!
//! This crate provides:
//! - Collections of JSON items with find/save/update/delete by identifier
//! - Advisory per-collection locking through sentinel marker files
//! - SHA-256 checksum sidecars to detect silent corruption
//! - Metadata sidecars with a store-managed version counter
//! - Snapshot-before-overwrite backups with retention and restore
//! - Full-system archives of the data directory
//!
//! It is not a transactional database: there is no atomicity across
//! collections, no query language, and each operation loads a whole
//! collection into memory.
//!
//! ## Example
//!
//! ```rust
//! use jsondb_core::{Item, JsonStore, StoreConfig};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = JsonStore::open(StoreConfig::new(dir.path())).unwrap();
//! let notices = store.collection("notices.json");
//!
//! let mut notice = Item::new();
//! notice.insert("id".into(), json!("notice_1"));
//! notice.insert("title".into(), json!("T"));
//! notices.save_item(notice).unwrap();
//!
//! let mut partial = Item::new();
//! partial.insert("title".into(), json!("T2"));
//! let updated = notices.update_item(&json!("notice_1"), partial).unwrap();
//! assert_eq!(updated.unwrap()["title"], json!("T2"));
//!
//! assert!(notices.delete_item(&json!("notice_1")).unwrap());
//! assert!(notices.read_items::<Item>().unwrap().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod backup;
pub mod checksum;
mod collection;
mod config;
pub mod dir;
mod error;
pub mod lock;
pub mod metadata;
mod store;
mod types;

pub use archive::{ArchiveManifest, ArchiveSummary, FullBackup, FullRestore, MANIFEST_FILE};
pub use backup::{BackupEntry, BackupManager};
pub use collection::{find_item_by_id, shallow_merge, Collection};
pub use config::{CorruptionPolicy, LockConfig, StoreConfig};
pub use error::{CoreError, CoreResult};
pub use lock::{LockGuard, LockManager};
pub use metadata::{FileMetadata, MetadataStore};
pub use store::JsonStore;
pub use types::{FileValidation, Item, Timestamp, DEFAULT_ID_FIELD};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
