//! CLI command implementations.

pub mod compact;
pub mod inspect;
pub mod sync;

pub use sync::SyncArgs;

use std::path::PathBuf;
use thiserror::Error;

/// Output format for commands that print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors raised by the CLI itself rather than the library crates.
#[derive(Error, Debug)]
pub enum CliError {
    /// The store directory has no journal.
    #[error("no store found at {0:?}")]
    MissingStore(PathBuf),

    /// A `--filter` argument is not `key=value`.
    #[error("invalid filter {0:?}: expected KEY=VALUE")]
    InvalidFilter(String),

    /// The source file is neither an array nor a list object.
    #[error("unrecognized source format in {path:?}: {message}")]
    InvalidSource {
        /// Source file.
        path: PathBuf,
        /// Parse error.
        message: String,
    },
}
