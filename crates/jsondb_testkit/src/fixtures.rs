//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use jsondb_core::{Item, JsonStore, StoreConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test store in a temporary directory, removed on drop.
pub struct TestStore {
    /// The store instance.
    pub store: JsonStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates a store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Creates a store whose configuration is adjusted by `configure`.
    ///
    /// ```rust,ignore
    /// let test = TestStore::with_config(|c| c.max_backups(3));
    /// ```
    pub fn with_config(configure: impl FnOnce(StoreConfig) -> StoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = configure(StoreConfig::new(temp_dir.path()));
        let store = JsonStore::open(config).expect("Failed to open store");
        Self { store, temp_dir }
    }

    /// Returns the data directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the path of a file in the data directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Returns the raw bytes of a file in the data directory.
    pub fn bytes(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path(name)).expect("Failed to read file")
    }

    /// Reads a collection as raw JSON values.
    pub fn values(&self, name: &str) -> Vec<Value> {
        self.store
            .collection(name)
            .read_items()
            .expect("Failed to read items")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = JsonStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust,ignore
/// use jsondb_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         let notices = store.collection("notices.json");
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&JsonStore) -> R,
{
    let test = TestStore::new();
    f(&test.store)
}

/// Converts a JSON object literal into an [`Item`].
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn item(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use serde_json::json;

    /// Creates a store whose `filename` collection holds `count` items with
    /// ids `item_0`, `item_1`, ...
    pub fn populated_store(filename: &str, count: usize) -> TestStore {
        let test = TestStore::new();
        let items: Vec<Value> = (0..count)
            .map(|i| json!({ "id": format!("item_{i}"), "index": i }))
            .collect();
        test.store
            .collection(filename)
            .write_items(&items)
            .expect("Failed to write items");
        test
    }

    /// Creates a store with `count` collections `c0.json`, `c1.json`, ...
    /// each holding one item.
    pub fn multi_collection_store(count: usize) -> (TestStore, Vec<String>) {
        let test = TestStore::new();
        let names: Vec<String> = (0..count).map(|i| format!("c{i}.json")).collect();
        for (i, name) in names.iter().enumerate() {
            test.store
                .collection(name.as_str())
                .save_item(item(json!({ "id": i, "name": name })))
                .expect("Failed to save item");
        }
        (test, names)
    }
}
