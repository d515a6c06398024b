//! Sync command implementation.

use super::{CliError, OutputFormat};
use pagesync_engine::{
    Collection, DescriptionRenderer, MemoryRemote, PassSummary, QueryFilter, RetryConfig,
    SyncConfig, SyncContext, SyncEngine, SyncItem,
};
use pagesync_storage::{FileStore, FileStoreConfig};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Arguments for one sync run.
#[derive(Debug, Clone)]
pub struct SyncArgs {
    /// JSON file with the remote's items.
    pub source: PathBuf,
    /// Store directory.
    pub store: PathBuf,
    /// Collection name.
    pub collection: String,
    /// Item cap.
    pub limit: Option<usize>,
    /// Page size override.
    pub page_size: Option<u32>,
    /// Raw `key=value` filters.
    pub filters: Vec<String>,
    /// Whether to render descriptions.
    pub render_description: bool,
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
    /// Attempts for transient failures.
    pub attempts: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceFile {
    Items(Vec<SyncItem>),
    List { data: Vec<SyncItem> },
}

/// Runs the sync command.
pub async fn run(args: &SyncArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let summary = execute(args).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("Sync complete: {}", summary.collection);
            println!("  Run:        {}", summary.run_id);
            println!("  Pages:      {}", summary.pages);
            println!("  Processed:  {}", summary.processed);
            println!("  Changed:    {}", summary.changed);
            match summary.watermark {
                Some(watermark) => println!("  Watermark:  {watermark}"),
                None => println!("  Watermark:  (none)"),
            }
            println!("  Duration:   {:?}", summary.duration);
        }
    }

    Ok(())
}

/// Loads the source, opens the store and runs one pass.
pub async fn execute(args: &SyncArgs) -> Result<PassSummary, Box<dyn std::error::Error>> {
    let items = load_source(&args.source)?;
    info!(
        source = %args.source.display(),
        items = items.len(),
        collection = %args.collection,
        "loaded fixture remote"
    );
    let remote = Arc::new(MemoryRemote::new("fixture", items));

    let mut filter = QueryFilter::new();
    for raw in &args.filters {
        let (key, value) = parse_filter(raw)?;
        filter = filter.with_param(key, value);
    }
    filter.item_cap = args.limit;
    filter.page_size = args.page_size;

    let mut collection = match args.collection.as_str() {
        "products" => Collection::products(remote, filter),
        "prices" => Collection::prices(remote, filter),
        name => Collection::named(name, remote, filter),
    };
    if args.render_description {
        collection = collection.with_renderer(Arc::new(DescriptionRenderer::new()));
    }

    let retry = if args.attempts > 1 {
        RetryConfig::new(args.attempts)
    } else {
        RetryConfig::no_retry()
    };
    let mut config = SyncConfig::new().with_retry(retry);
    if let Some(secs) = args.timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let store = Arc::new(FileStore::open(&args.store, FileStoreConfig::default())?);
    let engine = SyncEngine::new(config, SyncContext::from_store(store));
    Ok(engine.sync_with_retry(&collection).await?)
}

/// Reads remote items from a JSON file.
pub fn load_source(path: &Path) -> Result<Vec<SyncItem>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let source: SourceFile =
        serde_json::from_str(&text).map_err(|err| CliError::InvalidSource {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    Ok(match source {
        SourceFile::Items(items) | SourceFile::List { data: items } => items,
    })
}

/// Parses `key=value`. Values that parse as JSON keep their type; anything
/// else is a string.
pub fn parse_filter(raw: &str) -> Result<(String, Value), CliError> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| CliError::InvalidFilter(raw.to_string()))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
