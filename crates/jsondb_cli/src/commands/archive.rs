//! Full-system archive commands.

use super::Format;
use jsondb_core::JsonStore;
use tracing::info;

/// Archives every collection and its metadata.
pub fn create(store: &JsonStore, name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Creating archive of {:?}", store.dir().path());

    let backup = store.create_full_backup(name)?;

    println!("✓ Archive created successfully");
    println!("  Path: {:?}", backup.backup_path);
    println!("  Files: {}", backup.backed_up_files.len());
    for file in &backup.backed_up_files {
        println!("    {file}");
    }
    Ok(())
}

/// Lists archives, newest first.
pub fn list(store: &JsonStore, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let archives = store.list_scheduled_backups()?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&archives)?),
        Format::Text => {
            if archives.is_empty() {
                println!("No archives");
                return Ok(());
            }
            for archive in &archives {
                let created = archive.created_at.as_deref().unwrap_or("(no manifest)");
                let files = archive
                    .file_count
                    .map_or_else(|| "-".to_string(), |n| n.to_string());
                println!("  {:<40} {:<32} {} file(s)", archive.name, created, files);
            }
        }
    }
    Ok(())
}

/// Restores every collection recorded in an archive.
///
/// A partial restore is reported file by file and then fails; files
/// already restored stay restored.
pub fn restore(store: &JsonStore, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Restoring archive {}", name);

    let result = store.restore_from_scheduled_backup(name)?;
    for file in &result.restored_files {
        println!("  restored {file}");
    }

    if result.success {
        println!("✓ Archive {name} restored ({} file(s))", result.restored_files.len());
        Ok(())
    } else {
        let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
        println!("✗ Archive restore failed: {reason}");
        Err(format!("Archive restore failed: {reason}").into())
    }
}
