//! Validate command implementation.

use super::Format;
use jsondb_core::{FileValidation, JsonStore};
use serde::Serialize;

/// Validation outcome of one collection.
#[derive(Debug, Serialize)]
pub struct ValidateResult {
    /// Collection file name.
    pub file: String,
    /// Whether the file exists.
    pub exists: bool,
    /// Whether the file matches its checksum.
    pub valid: bool,
}

impl ValidateResult {
    fn new(file: String, validation: FileValidation) -> Self {
        Self {
            file,
            exists: validation.exists,
            valid: validation.valid,
        }
    }
}

/// Runs the validate command.
///
/// Fails if any checked collection is missing or does not match its
/// checksum.
pub fn run(
    store: &JsonStore,
    file: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;

    let results: Vec<ValidateResult> = match file {
        Some(file) => vec![ValidateResult::new(
            file.to_string(),
            store.validate_file(file)?,
        )],
        None => store
            .validate_all()?
            .into_iter()
            .map(|(file, validation)| ValidateResult::new(file, validation))
            .collect(),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        Format::Text => {
            for result in &results {
                let status = match (result.exists, result.valid) {
                    (false, _) => "missing",
                    (true, true) => "ok",
                    (true, false) => "CHECKSUM MISMATCH",
                };
                println!("{:<40} {}", result.file, status);
            }
        }
    }

    let failed = results.iter().filter(|r| !r.exists || !r.valid).count();
    if failed == 0 {
        if format == Format::Text {
            println!();
            println!("✓ {} collection(s) verified", results.len());
        }
        Ok(())
    } else {
        Err(format!("{failed} collection(s) failed validation").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsondb_core::StoreConfig;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn validate_passes_then_fails_after_tampering() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(StoreConfig::new(dir.path())).unwrap();
        store.write_json_file("a.json", &json!([1, 2, 3])).unwrap();

        run(&store, None, "text").unwrap();
        run(&store, Some("a.json"), "json").unwrap();

        fs::write(dir.path().join("a.json"), b"[1]").unwrap();
        assert!(run(&store, None, "text").is_err());
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(StoreConfig::new(dir.path())).unwrap();
        assert!(run(&store, Some("none.json"), "text").is_err());
    }
}
