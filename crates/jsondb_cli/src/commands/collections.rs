//! Collection listing, dumping, and metadata commands.

use jsondb_core::JsonStore;
use serde_json::Value;
use tracing::info;

/// Lists the collection files in the data directory.
pub fn list(store: &JsonStore) -> Result<(), Box<dyn std::error::Error>> {
    let collections = store.list_collections()?;
    info!("Found {} collections in {:?}", collections.len(), store.dir().path());

    for name in &collections {
        println!("{name}");
    }
    Ok(())
}

/// Prints the items of a collection as pretty JSON.
///
/// Goes through the regular read path, so a missing or unparsable file is
/// reinitialized exactly as it would be for any other reader.
pub fn dump(
    store: &JsonStore,
    file: &str,
    list_key: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut collection = store.collection(file);
    if let Some(key) = list_key {
        collection = collection.with_list_key(key);
    }

    let items: Vec<Value> = collection.read_items()?;
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

/// Prints the metadata sidecar of a collection.
pub fn metadata(store: &JsonStore, file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = store.read_file_metadata(file)?;
    if metadata.is_empty() {
        println!("No metadata recorded for {file}");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsondb_core::StoreConfig;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn dump_reads_list_key_collections() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(StoreConfig::new(dir.path())).unwrap();
        store
            .write_json_file("s.json", &json!({ "entries": [{ "id": 1 }] }))
            .unwrap();

        dump(&store, "s.json", Some("entries")).unwrap();
        list(&store).unwrap();
        metadata(&store, "s.json").unwrap();
    }

    #[test]
    fn dump_rejects_bad_names() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(StoreConfig::new(dir.path())).unwrap();
        assert!(dump(&store, "../x.json", None).is_err());
    }
}
