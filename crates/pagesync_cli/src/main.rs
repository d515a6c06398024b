//! Pagesync CLI
//!
//! Command-line tools for running sync passes and maintaining stores.
//!
//! # Commands
//!
//! - `sync` - Run one pass from a JSON fixture remote into a file store
//! - `inspect` - Display store statistics and watermarks
//! - `compact` - Rewrite the store journal with only the latest state

mod commands;

use clap::{Parser, Subcommand};
use commands::{OutputFormat, SyncArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// pagesync command-line tools.
#[derive(Parser)]
#[command(name = "pagesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one incremental sync pass
    Sync {
        /// JSON file with the remote's items (array or `{"data": [...]}`)
        #[arg(long)]
        source: PathBuf,

        /// Collection to sync (products, prices, or any name)
        #[arg(short, long, default_value = "products")]
        collection: String,

        /// Maximum number of items to sync in this pass
        #[arg(short, long)]
        limit: Option<usize>,

        /// Items per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Listing filter as key=value, repeatable
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Store an HTML rendering of each item's description
        #[arg(long)]
        render_description: bool,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Attempts for transient failures
        #[arg(long, default_value = "1")]
        attempts: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Display store statistics and watermarks
    Inspect {
        /// List every record
        #[arg(short, long)]
        records: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Compact the store journal
    Compact,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            source,
            collection,
            limit,
            page_size,
            filters,
            render_description,
            timeout,
            attempts,
            format,
        } => {
            let store = cli.store.ok_or("Store path required for sync")?;
            let args = SyncArgs {
                source,
                store,
                collection,
                limit,
                page_size,
                filters,
                render_description,
                timeout,
                attempts,
            };
            commands::sync::run(&args, format).await?;
        }
        Commands::Inspect { records, format } => {
            let store = cli.store.ok_or("Store path required for inspect")?;
            commands::inspect::run(&store, records, format)?;
        }
        Commands::Compact => {
            let store = cli.store.ok_or("Store path required for compact")?;
            commands::compact::run(&store)?;
        }
        Commands::Version => {
            println!("pagesync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
