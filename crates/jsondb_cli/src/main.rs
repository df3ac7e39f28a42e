//! JsonDB CLI
//!
//! Command-line tools for inspecting and maintaining a JsonDB data directory.
//!
//! # Commands
//!
//! - `collections` - List collection files
//! - `dump` - Print the items of a collection
//! - `validate` - Check collections against their checksums
//! - `backups` / `restore` - List and restore per-collection snapshots
//! - `archive` - Create, list, and restore full-system archives
//! - `metadata` - Print a collection's metadata sidecar

mod commands;

use clap::{Parser, Subcommand};
use jsondb_core::{JsonStore, StoreConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// JsonDB command-line tools.
#[derive(Parser)]
#[command(name = "jsondb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Snapshots kept per collection
    #[arg(global = true, long)]
    max_backups: Option<usize>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List collection files
    Collections,

    /// Print the items of a collection as JSON
    Dump {
        /// Collection file name (e.g. notices.json)
        file: String,

        /// Key holding the item list when the file is an object
        #[arg(short, long)]
        list_key: Option<String>,
    },

    /// Check one or all collections against their checksums
    Validate {
        /// Collection file name; all collections if omitted
        file: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the snapshots of a collection, newest first
    Backups {
        /// Collection file name
        file: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Restore a collection from one of its snapshots
    Restore {
        /// Collection file name
        file: String,

        /// Snapshot file name, as listed by `backups`
        backup: String,
    },

    /// Full-system archives
    Archive {
        #[command(subcommand)]
        action: ArchiveAction,
    },

    /// Print the metadata sidecar of a collection
    Metadata {
        /// Collection file name
        file: String,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ArchiveAction {
    /// Archive every collection and its metadata
    Create {
        /// Archive name; derived from the current time if omitted
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List archives, newest first
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Restore every collection from an archive
    Restore {
        /// Archive name
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("JsonDB CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("JsonDB Core v{}", jsondb_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Data directory path required (--path)")?;
    let mut config = StoreConfig::new(&path);
    if let Some(max_backups) = cli.max_backups {
        config = config.max_backups(max_backups);
    }
    let store = JsonStore::open(config)?;

    match cli.command {
        Commands::Collections => commands::collections::list(&store)?,
        Commands::Dump { file, list_key } => {
            commands::collections::dump(&store, &file, list_key.as_deref())?;
        }
        Commands::Validate { file, format } => {
            commands::validate::run(&store, file.as_deref(), &format)?;
        }
        Commands::Backups { file, format } => commands::backup::list(&store, &file, &format)?,
        Commands::Restore { file, backup } => commands::backup::restore(&store, &file, &backup)?,
        Commands::Archive { action } => match action {
            ArchiveAction::Create { name } => commands::archive::create(&store, name.as_deref())?,
            ArchiveAction::List { format } => commands::archive::list(&store, &format)?,
            ArchiveAction::Restore { name } => commands::archive::restore(&store, &name)?,
        },
        Commands::Metadata { file } => commands::collections::metadata(&store, &file)?,
        Commands::Version => {}
    }

    Ok(())
}
