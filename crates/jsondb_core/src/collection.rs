//! Collection handles and item-level CRUD.
//!
//! A collection file holds either a top-level array of items or, when a
//! list key is set, an object `{ "<list_key>": [items...] }`.
//!
//! Item-level operations (`save_item`, `update_item`, `delete_item`) hold
//! the collection lock across read, modify, and write, so concurrent callers
//! never lose each other's changes. If the write fails the change is
//! discarded; nothing is applied partially.
//!
//! Merging is shallow: top-level fields of the partial replace those of the
//! stored item, nested objects included.

use crate::config::CorruptionPolicy;
use crate::dir::base_name;
use crate::error::{CoreError, CoreResult};
use crate::store::JsonStore;
use crate::types::{FileValidation, Item, Timestamp, DEFAULT_ID_FIELD};
use jsondb_storage::AtomicFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Returns the first item whose `id_field` equals `id`, with its index.
///
/// Identifiers compare as JSON values, so `"1"` and `1` are different ids.
#[must_use]
pub fn find_item_by_id<'a>(
    items: &'a [Item],
    id: &Value,
    id_field: &str,
) -> Option<(usize, &'a Item)> {
    items
        .iter()
        .enumerate()
        .find(|(_, item)| item.get(id_field) == Some(id))
}

/// Copies every top-level field of `partial` into `target`.
pub fn shallow_merge(target: &mut Item, partial: Item) {
    for (key, value) in partial {
        target.insert(key, value);
    }
}

/// What was found on disk for a collection.
enum Loaded {
    /// Items, with the enclosing object when a list key is used.
    Items(Vec<Value>, Option<Map<String, Value>>),
    Missing,
    Empty,
    Corrupt(serde_json::Error),
    /// Valid JSON that does not hold a list where this handle expects one.
    WrongShape,
}

/// A handle on one collection file.
///
/// Created by [`JsonStore::collection`]. Cheap; holds no file handles.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    store: &'a JsonStore,
    filename: String,
    list_key: Option<String>,
    id_field: String,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(store: &'a JsonStore, filename: String) -> Self {
        Self {
            store,
            filename,
            list_key: None,
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// Stores items under `key` inside a top-level object.
    #[must_use]
    pub fn with_list_key(mut self, key: impl Into<String>) -> Self {
        self.list_key = Some(key.into());
        self
    }

    /// Uses `field` instead of `id` as the identifier.
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Returns the collection file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the list key, if any.
    #[must_use]
    pub fn list_key(&self) -> Option<&str> {
        self.list_key.as_deref()
    }

    /// Returns the identifier field name.
    #[must_use]
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Returns the path of the collection file.
    pub fn path(&self) -> CoreResult<PathBuf> {
        self.store.dir().collection_path(&self.filename)
    }

    /// Reads all items.
    ///
    /// A missing, empty, or unparsable file reads as an empty collection and
    /// is reinitialized on disk; the unparsable bytes survive as a snapshot.
    /// Under [`CorruptionPolicy::Quarantine`] an unparsable file is moved
    /// aside and [`CoreError::Corrupted`] is returned instead.
    ///
    /// The reinitialization re-reads the file under the collection lock, so
    /// a writer that committed in the meantime is never overwritten.
    ///
    /// # Errors
    ///
    /// Items that are valid JSON but don't deserialize into `T` are an
    /// error; they are never discarded.
    pub fn read_items<T: DeserializeOwned>(&self) -> CoreResult<Vec<T>> {
        let path = self.path()?;

        let values = match self.load(&path)? {
            Loaded::Items(values, _) => values,
            Loaded::WrongShape => {
                debug!(collection = %self.filename, "document holds no item list; reading as empty");
                Vec::new()
            }
            Loaded::Missing | Loaded::Empty | Loaded::Corrupt(_) => self.heal(&path)?,
        };

        Ok(serde_json::from_value(Value::Array(values))?)
    }

    /// Replaces all items.
    ///
    /// With a list key, other fields of the enclosing object are kept.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidItem`] if the file holds valid JSON of another
    /// shape; it is left untouched.
    pub fn write_items<T: Serialize>(&self, items: &[T]) -> CoreResult<()> {
        let values = match serde_json::to_value(items)? {
            Value::Array(values) => values,
            _ => return Err(CoreError::invalid_item("items did not serialize to an array")),
        };

        let path = self.path()?;
        let _guard = self.store.lock(&path)?;
        let container = match self.load(&path)? {
            Loaded::Items(_, container) => container,
            Loaded::WrongShape => return Err(self.wrong_shape()),
            Loaded::Missing | Loaded::Empty | Loaded::Corrupt(_) => None,
        };
        self.store
            .write_locked(&self.filename, &path, &self.document(values, container))
    }

    /// Reads the item with the given identifier.
    pub fn find_item(&self, id: &Value) -> CoreResult<Option<Item>> {
        let items: Vec<Item> = self.read_items()?;
        Ok(find_item_by_id(&items, id, &self.id_field).map(|(_, item)| item.clone()))
    }

    /// Inserts `item`, or shallow-merges it into the stored item with the
    /// same identifier. Returns the stored item.
    ///
    /// # Errors
    ///
    /// [`CoreError::MissingIdField`] if `item` has no (or a null) identifier.
    pub fn save_item(&self, item: Item) -> CoreResult<Item> {
        let id = match item.get(&self.id_field) {
            Some(id) if !id.is_null() => id.clone(),
            _ => return Err(CoreError::missing_id_field(&self.id_field)),
        };

        self.mutate(|items| {
            let saved = match find_item_by_id(items, &id, &self.id_field) {
                Some((index, _)) => {
                    let existing = &mut items[index];
                    shallow_merge(existing, item);
                    existing.clone()
                }
                None => {
                    items.push(item.clone());
                    item
                }
            };
            Ok((saved, true))
        })
    }

    /// Shallow-merges `partial` into the stored item with identifier `id`.
    ///
    /// Returns `None`, writing nothing, if no such item exists; this never
    /// creates an item. The identifier itself cannot be changed.
    pub fn update_item(&self, id: &Value, partial: Item) -> CoreResult<Option<Item>> {
        self.mutate(|items| {
            let Some((index, _)) = find_item_by_id(items, id, &self.id_field) else {
                return Ok((None, false));
            };
            let existing = &mut items[index];
            shallow_merge(existing, partial);
            existing.insert(self.id_field.clone(), id.clone());
            Ok((Some(existing.clone()), true))
        })
    }

    /// Removes the item with identifier `id`. Returns whether one was
    /// removed; when none was, the file is left untouched.
    pub fn delete_item(&self, id: &Value) -> CoreResult<bool> {
        self.mutate(|items| match find_item_by_id(items, id, &self.id_field) {
            Some((index, _)) => {
                items.remove(index);
                Ok((true, true))
            }
            None => Ok((false, false)),
        })
    }

    /// Checks the collection file against its checksum sidecar.
    pub fn validate(&self) -> CoreResult<FileValidation> {
        self.store.validate_file(&self.filename)
    }

    /// Runs `f` over the items under the collection lock and writes them
    /// back if `f` reports a change.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<Item>) -> CoreResult<(R, bool)>,
    ) -> CoreResult<R> {
        let path = self.path()?;
        let _guard = self.store.lock(&path)?;

        let (mut items, container) = match self.load(&path)? {
            Loaded::Items(values, container) => (into_items(values)?, container),
            Loaded::WrongShape => return Err(self.wrong_shape()),
            Loaded::Missing | Loaded::Empty => (Vec::new(), None),
            Loaded::Corrupt(e) => {
                self.handle_corrupt(&path, &e)?;
                (Vec::new(), None)
            }
        };

        let (result, changed) = f(&mut items)?;
        if changed {
            let values = items.into_iter().map(Value::Object).collect();
            self.store
                .write_locked(&self.filename, &path, &self.document(values, container))?;
        }
        Ok(result)
    }

    fn load(&self, path: &Path) -> CoreResult<Loaded> {
        let Some(data) = AtomicFile::new(path).read()? else {
            return Ok(Loaded::Missing);
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Loaded::Empty);
        }

        let document: Value = match serde_json::from_slice(&data) {
            Ok(document) => document,
            Err(e) => return Ok(Loaded::Corrupt(e)),
        };

        match (document, &self.list_key) {
            (Value::Array(values), None) => Ok(Loaded::Items(values, None)),
            (Value::Object(mut object), Some(key)) => {
                // The list stays in place so the key keeps its position.
                let values = match object.get_mut(key) {
                    Some(Value::Array(values)) => std::mem::take(values),
                    None => Vec::new(),
                    Some(_) => return Ok(Loaded::WrongShape),
                };
                Ok(Loaded::Items(values, Some(object)))
            }
            _ => Ok(Loaded::WrongShape),
        }
    }

    /// Re-checks the file under the lock and reinitializes it only if it is
    /// still missing, empty, or unparsable. If a writer got there first, its
    /// items are returned instead.
    fn heal(&self, path: &Path) -> CoreResult<Vec<Value>> {
        let _guard = self.store.lock(path)?;

        match self.load(path)? {
            Loaded::Items(values, _) => return Ok(values),
            Loaded::WrongShape => return Ok(Vec::new()),
            Loaded::Missing => {
                warn!(collection = %self.filename, "collection missing; initializing");
            }
            Loaded::Empty => {
                warn!(collection = %self.filename, "collection file empty; reinitializing");
            }
            Loaded::Corrupt(e) => self.handle_corrupt(path, &e)?,
        }

        // A failed rewrite only costs the self-heal, not the read.
        let empty = self.document(Vec::new(), None);
        if let Err(e) = self.store.write_locked(&self.filename, path, &empty) {
            warn!(collection = %self.filename, error = %e, "failed to reinitialize collection");
        }
        Ok(Vec::new())
    }

    /// Applies the corruption policy. Returns `Ok` when the caller should
    /// carry on with an empty collection.
    fn handle_corrupt(&self, path: &Path, error: &serde_json::Error) -> CoreResult<()> {
        match self.store.config().corruption_policy {
            CorruptionPolicy::Reinitialize => {
                warn!(
                    collection = %self.filename,
                    error = %error,
                    "collection is not valid JSON; treating as empty"
                );
                Ok(())
            }
            CorruptionPolicy::Quarantine => {
                let dir = self.store.dir().quarantine_dir();
                fs::create_dir_all(dir)?;
                let target = dir.join(format!(
                    "{}_{}.json",
                    base_name(&self.filename),
                    Timestamp::now()
                ));
                fs::rename(path, &target)?;
                warn!(
                    collection = %self.filename,
                    quarantined_to = %target.display(),
                    "collection is not valid JSON; quarantined"
                );
                Err(CoreError::Corrupted {
                    path: path.to_path_buf(),
                    quarantined_to: target,
                })
            }
        }
    }

    fn wrong_shape(&self) -> CoreError {
        let expected = match &self.list_key {
            Some(key) => format!("an object with an array under `{key}`"),
            None => "an array".to_string(),
        };
        CoreError::invalid_item(format!(
            "{} is not {expected}; refusing to overwrite it",
            self.filename
        ))
    }

    fn document(&self, values: Vec<Value>, container: Option<Map<String, Value>>) -> Value {
        match &self.list_key {
            Some(key) => {
                let mut object = container.unwrap_or_default();
                object.insert(key.clone(), Value::Array(values));
                Value::Object(object)
            }
            None => Value::Array(values),
        }
    }
}

fn into_items(values: Vec<Value>) -> CoreResult<Vec<Item>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(item) => Ok(item),
            other => Err(CoreError::invalid_item(format!(
                "element {index} is not an object: {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde::Deserialize;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn open() -> (TempDir, JsonStore) {
        let temp = tempdir().unwrap();
        let store = JsonStore::open(StoreConfig::new(temp.path())).unwrap();
        (temp, store)
    }

    #[test]
    fn find_by_id_returns_first_match() {
        let items = vec![
            item(json!({ "id": 1, "n": "a" })),
            item(json!({ "id": 2, "n": "b" })),
            item(json!({ "id": 2, "n": "c" })),
        ];

        let (index, found) = find_item_by_id(&items, &json!(2), "id").unwrap();
        assert_eq!(index, 1);
        assert_eq!(found["n"], json!("b"));
        assert!(find_item_by_id(&items, &json!("2"), "id").is_none());
        assert!(find_item_by_id(&items, &json!(1), "uid").is_none());
    }

    #[test]
    fn shallow_merge_replaces_nested_objects() {
        let mut target = item(json!({ "a": 1, "nested": { "x": 1, "y": 2 } }));
        shallow_merge(&mut target, item(json!({ "nested": { "x": 9 }, "b": 2 })));

        assert_eq!(
            Value::Object(target),
            json!({ "a": 1, "nested": { "x": 9 }, "b": 2 })
        );
    }

    #[test]
    fn read_missing_initializes_file() {
        let (temp, store) = open();
        let notices = store.collection("notices.json");

        let items: Vec<Item> = notices.read_items().unwrap();
        assert!(items.is_empty());
        assert_eq!(
            fs::read_to_string(temp.path().join("notices.json")).unwrap(),
            "[]"
        );
    }

    #[test]
    fn read_missing_with_list_key_initializes_object() {
        let (_temp, store) = open();
        let chat = store.collection("chat.json").with_list_key("messages");

        let items: Vec<Item> = chat.read_items().unwrap();
        assert!(items.is_empty());
        assert_eq!(
            store.read_json_file("chat.json").unwrap(),
            Some(json!({ "messages": [] }))
        );
    }

    #[test]
    fn read_corrupt_self_heals_and_keeps_snapshot() {
        let (temp, store) = open();
        fs::write(temp.path().join("a.json"), b"[{\"id\": 1,").unwrap();

        let items: Vec<Item> = store.collection("a.json").read_items().unwrap();
        assert!(items.is_empty());
        assert_eq!(store.read_json_file("a.json").unwrap(), Some(json!([])));

        let backups = store.list_file_backups("a.json").unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read(&backups[0].path).unwrap(), b"[{\"id\": 1,");
    }

    #[test]
    fn read_empty_file_self_heals() {
        let (temp, store) = open();
        fs::write(temp.path().join("a.json"), b"  \n").unwrap();

        let items: Vec<Item> = store.collection("a.json").read_items().unwrap();
        assert!(items.is_empty());
        assert_eq!(store.read_json_file("a.json").unwrap(), Some(json!([])));
    }

    #[test]
    fn read_corrupt_with_quarantine_policy() {
        let temp = tempdir().unwrap();
        let store = JsonStore::open(
            StoreConfig::new(temp.path()).corruption_policy(CorruptionPolicy::Quarantine),
        )
        .unwrap();
        fs::write(temp.path().join("a.json"), b"garbage").unwrap();

        let err = store.collection("a.json").read_items::<Item>().unwrap_err();
        let CoreError::Corrupted { quarantined_to, .. } = err else {
            panic!("expected Corrupted, got {err:?}");
        };
        assert_eq!(fs::read(quarantined_to).unwrap(), b"garbage");
        assert!(!temp.path().join("a.json").exists());
    }

    #[test]
    fn wrong_shape_reads_empty_without_rewrite() {
        let (temp, store) = open();
        fs::write(temp.path().join("a.json"), br#"{"other": [1]}"#).unwrap();

        let items: Vec<Item> = store.collection("a.json").read_items().unwrap();
        assert!(items.is_empty());
        assert_eq!(
            fs::read(temp.path().join("a.json")).unwrap(),
            br#"{"other": [1]}"#
        );
    }

    #[test]
    fn typed_read_mismatch_is_an_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Notice {
            id: String,
            title: String,
        }

        let (_temp, store) = open();
        let notices = store.collection("notices.json");
        notices.write_items(&[json!({ "id": 1 })]).unwrap();

        assert!(matches!(
            notices.read_items::<Notice>(),
            Err(CoreError::Json(_))
        ));
        assert_eq!(
            store.read_json_file("notices.json").unwrap(),
            Some(json!([{ "id": 1 }]))
        );
    }

    #[test]
    fn save_requires_id() {
        let (_temp, store) = open();
        let notices = store.collection("notices.json");

        assert!(matches!(
            notices.save_item(item(json!({ "title": "T" }))),
            Err(CoreError::MissingIdField { .. })
        ));
        assert!(matches!(
            notices.save_item(item(json!({ "id": null }))),
            Err(CoreError::MissingIdField { .. })
        ));
    }

    #[test]
    fn save_appends_then_merges() {
        let (_temp, store) = open();
        let notices = store.collection("notices.json");

        notices
            .save_item(item(json!({ "id": "a", "title": "T", "content": "C" })))
            .unwrap();
        notices.save_item(item(json!({ "id": "b" }))).unwrap();
        let merged = notices
            .save_item(item(json!({ "id": "a", "title": "T2" })))
            .unwrap();

        assert_eq!(
            Value::Object(merged),
            json!({ "id": "a", "title": "T2", "content": "C" })
        );
        let all: Vec<Value> = notices.read_items().unwrap();
        assert_eq!(
            all,
            vec![
                json!({ "id": "a", "title": "T2", "content": "C" }),
                json!({ "id": "b" })
            ]
        );
    }

    #[test]
    fn custom_id_field() {
        let (_temp, store) = open();
        let users = store.collection("users.json").with_id_field("uid");

        users.save_item(item(json!({ "uid": 7, "name": "x" }))).unwrap();
        let updated = users
            .update_item(&json!(7), item(json!({ "name": "y" })))
            .unwrap()
            .unwrap();

        assert_eq!(updated["name"], json!("y"));
        assert!(users.find_item(&json!(7)).unwrap().is_some());
    }

    #[test]
    fn update_cannot_change_id() {
        let (_temp, store) = open();
        let notices = store.collection("notices.json");
        notices.save_item(item(json!({ "id": "a" }))).unwrap();

        let updated = notices
            .update_item(&json!("a"), item(json!({ "id": "z", "x": 1 })))
            .unwrap()
            .unwrap();

        assert_eq!(Value::Object(updated), json!({ "id": "a", "x": 1 }));
    }

    #[test]
    fn update_missing_writes_nothing() {
        let (temp, store) = open();
        let notices = store.collection("notices.json");
        notices.save_item(item(json!({ "id": "a" }))).unwrap();
        let before = fs::read(temp.path().join("notices.json")).unwrap();

        let result = notices
            .update_item(&json!("missing"), item(json!({ "x": 1 })))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(fs::read(temp.path().join("notices.json")).unwrap(), before);
        assert!(store.list_file_backups("notices.json").unwrap().is_empty());
    }

    #[test]
    fn list_key_collections() {
        let (_temp, store) = open();
        let chat = store.collection("chat.json").with_list_key("messages");

        chat.save_item(item(json!({ "id": 1, "text": "hi" }))).unwrap();
        chat.save_item(item(json!({ "id": 2, "text": "yo" }))).unwrap();
        assert!(chat.delete_item(&json!(1)).unwrap());

        assert_eq!(
            store.read_json_file("chat.json").unwrap(),
            Some(json!({ "messages": [{ "id": 2, "text": "yo" }] }))
        );
    }

    #[test]
    fn non_object_elements_are_rejected_by_item_operations() {
        let (temp, store) = open();
        fs::write(temp.path().join("a.json"), b"[1, 2]").unwrap();

        let err = store
            .collection("a.json")
            .save_item(item(json!({ "id": 1 })))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidItem { .. }));
        assert_eq!(fs::read(temp.path().join("a.json")).unwrap(), b"[1, 2]");
    }

    #[test]
    fn mutate_on_corrupt_file_starts_fresh() {
        let (temp, store) = open();
        fs::write(temp.path().join("a.json"), b"{{{").unwrap();

        store
            .collection("a.json")
            .save_item(item(json!({ "id": 1 })))
            .unwrap();

        assert_eq!(store.read_json_file("a.json").unwrap(), Some(json!([{ "id": 1 }])));
    }

    #[test]
    fn self_heal_keeps_a_write_committed_while_waiting() {
        let (temp, store) = open();
        let path = temp.path().join("n.json");
        let guard = store.locks().acquire(&path).unwrap();

        std::thread::scope(|s| {
            let reader = s.spawn(|| store.collection("n.json").read_items::<Item>().unwrap());

            std::thread::sleep(Duration::from_millis(50));
            fs::write(&path, br#"[{"id":"kept"}]"#).unwrap();
            drop(guard);

            let items = reader.join().unwrap();
            assert_eq!(items, vec![item(json!({ "id": "kept" }))]);
        });

        assert_eq!(
            store.read_json_file("n.json").unwrap(),
            Some(json!([{ "id": "kept" }]))
        );
    }

    #[test]
    fn missing_file_self_heal_logs_a_warning() {
        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let (_temp, store) = open();
        tracing::subscriber::with_default(subscriber, || {
            let items: Vec<Item> = store.collection("n.json").read_items().unwrap();
            assert!(items.is_empty());
        });

        let logs = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("collection missing"), "{logs}");
    }

    #[test]
    fn item_operations_refuse_a_document_of_another_shape() {
        let (temp, store) = open();
        let path = temp.path().join("a.json");
        fs::write(&path, br#"[{"id":1},{"id":2}]"#).unwrap();
        let chat = store.collection("a.json").with_list_key("messages");

        let err = chat.save_item(item(json!({ "id": 3 }))).unwrap_err();
        assert!(matches!(err, CoreError::InvalidItem { .. }));
        assert!(matches!(
            chat.write_items(&[json!({ "id": 3 })]),
            Err(CoreError::InvalidItem { .. })
        ));
        assert!(chat.delete_item(&json!(1)).is_err());

        assert_eq!(fs::read(&path).unwrap(), br#"[{"id":1},{"id":2}]"#);
        let items: Vec<Item> = chat.read_items().unwrap();
        assert!(items.is_empty());
        assert!(store.list_file_backups("a.json").unwrap().is_empty());
    }

    #[test]
    fn list_key_writes_keep_sibling_fields() {
        let (temp, store) = open();
        let path = temp.path().join("chat.json");
        fs::write(&path, br#"{"title":"general","messages":[{"id":1}],"open":true}"#).unwrap();
        let chat = store.collection("chat.json").with_list_key("messages");

        chat.save_item(item(json!({ "id": 2 }))).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let document: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            document,
            json!({ "title": "general", "messages": [{ "id": 1 }, { "id": 2 }], "open": true })
        );
        let (title, messages, open) = (
            text.find("title").unwrap(),
            text.find("messages").unwrap(),
            text.find("open").unwrap(),
        );
        assert!(title < messages && messages < open);

        fs::write(&path, br#"{"title":"general"}"#).unwrap();
        chat.write_items(&[json!({ "id": 9 })]).unwrap();
        assert_eq!(
            store.read_json_file("chat.json").unwrap(),
            Some(json!({ "title": "general", "messages": [{ "id": 9 }] }))
        );
    }

    mod merge_properties {
        use super::super::shallow_merge;
        use crate::types::Item;
        use proptest::prelude::*;
        use serde_json::Value;

        fn fields() -> impl Strategy<Value = Item> {
            prop::collection::btree_map("[a-d]", any::<i32>().prop_map(Value::from), 0..4)
                .prop_map(|fields| fields.into_iter().collect())
        }

        proptest! {
            #[test]
            fn merge_is_idempotent(target in fields(), partial in fields()) {
                let mut once = target.clone();
                shallow_merge(&mut once, partial.clone());
                let mut twice = once.clone();
                shallow_merge(&mut twice, partial);
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn partial_fields_win(target in fields(), partial in fields()) {
                let mut merged = target.clone();
                shallow_merge(&mut merged, partial.clone());
                for (key, value) in &partial {
                    prop_assert_eq!(merged.get(key), Some(value));
                }
                for (key, value) in &target {
                    if !partial.contains_key(key) {
                        prop_assert_eq!(merged.get(key), Some(value));
                    }
                }
            }
        }
    }
}
