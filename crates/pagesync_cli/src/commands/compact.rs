//! Compact command implementation.

use super::CliError;
use pagesync_storage::{CompactStats, FileStore, FileStoreConfig};
use std::path::Path;

/// Runs the compact command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Compacting store at {:?}", path);
    println!();

    let stats = compact(path)?;

    println!("  Entries before: {}", stats.entries_before);
    println!("  Entries after:  {}", stats.entries_after);
    if stats.entries_after < stats.entries_before {
        println!(
            "  Removed:        {} superseded entries",
            stats.entries_before - stats.entries_after
        );
    } else {
        println!();
        println!("No compaction needed - journal is already minimal");
    }

    Ok(())
}

/// Compacts the store at `path`.
pub fn compact(path: &Path) -> Result<CompactStats, Box<dyn std::error::Error>> {
    if !path.join("store.log").exists() {
        return Err(CliError::MissingStore(path.to_path_buf()).into());
    }
    let store = FileStore::open(path, FileStoreConfig::default())?;
    Ok(store.compact()?)
}
