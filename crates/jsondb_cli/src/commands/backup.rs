//! Per-collection snapshot commands.

use super::{format_timestamp, Format};
use jsondb_core::JsonStore;
use tracing::info;

/// Lists the snapshots of a collection, newest first.
pub fn list(
    store: &JsonStore,
    file: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let backups = store.list_file_backups(file)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&backups)?),
        Format::Text => {
            if backups.is_empty() {
                println!("No snapshots of {file}");
                return Ok(());
            }
            println!("Snapshots of {file} (newest first)");
            for entry in &backups {
                // Safety snapshots carry no parseable stamp.
                let taken = if entry.timestamp.as_millis() == 0 {
                    "-".to_string()
                } else {
                    format_timestamp(entry.timestamp)
                };
                println!("  {:<48} {}", entry.file_name, taken);
            }
        }
    }
    Ok(())
}

/// Restores a collection from one of its snapshots.
pub fn restore(
    store: &JsonStore,
    file: &str,
    backup: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Restoring {} from snapshot {}", file, backup);

    store.restore_from_backup(file, backup)?;

    let validation = store.validate_file(file)?;
    println!("✓ {file} restored from {backup}");
    println!("  Checksum: {}", if validation.valid { "ok" } else { "mismatch" });
    Ok(())
}
