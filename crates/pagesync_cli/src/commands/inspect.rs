//! Inspect command implementation.

use super::{CliError, OutputFormat};
use pagesync_storage::{FileStore, FileStoreConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_size: u64,
    /// Number of journal entries.
    pub journal_entries: u64,
    /// Number of live records.
    pub record_count: usize,
    /// Number of records with a rendering.
    pub rendered_count: usize,
    /// Metadata, including watermarks.
    pub metadata: BTreeMap<String, String>,
    /// Per-record summaries (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<RecordSummary>>,
}

/// Summary of a single record.
#[derive(Debug, Serialize)]
pub struct RecordSummary {
    /// Record id.
    pub id: String,
    /// Content digest.
    pub digest: String,
    /// Whether a rendering is stored.
    pub rendered: bool,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_records: bool, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path, show_records)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_text_output(&result),
    }

    Ok(())
}

/// Collects statistics for the store at `path`.
pub fn inspect(path: &Path, show_records: bool) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let journal = path.join("store.log");
    if !journal.exists() {
        return Err(CliError::MissingStore(path.to_path_buf()).into());
    }

    let store = FileStore::open(path, FileStoreConfig::default())?;
    let records = store.records();

    Ok(InspectResult {
        path: path.display().to_string(),
        journal_size: std::fs::metadata(&journal)?.len(),
        journal_entries: store.journal_entries(),
        record_count: records.len(),
        rendered_count: records.iter().filter(|r| r.rendered.is_some()).count(),
        metadata: store.metadata(),
        records: show_records.then(|| {
            records
                .iter()
                .map(|r| RecordSummary {
                    id: r.id.clone(),
                    digest: r.digest.as_str().to_string(),
                    rendered: r.rendered.is_some(),
                })
                .collect()
        }),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!();
    println!("Journal:");
    println!("  Size:    {} bytes", result.journal_size);
    println!("  Entries: {}", result.journal_entries);
    println!();
    println!("Records:");
    println!("  Live:     {}", result.record_count);
    println!("  Rendered: {}", result.rendered_count);

    if !result.metadata.is_empty() {
        println!();
        println!("Metadata:");
        for (key, value) in &result.metadata {
            println!("  {key} = {value}");
        }
    }

    if let Some(records) = &result.records {
        println!();
        println!("{:<32} {:<16} Rendered", "Id", "Digest");
        for record in records {
            let short = record.digest.get(..12).unwrap_or(&record.digest);
            println!(
                "{:<32} {:<16} {}",
                record.id,
                short,
                if record.rendered { "yes" } else { "no" }
            );
        }
    }
}
