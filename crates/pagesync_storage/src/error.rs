//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A journal entry could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The journal contains an unreadable entry before its final line.
    #[error("store journal corrupted at line {line}: {message}")]
    Corrupted {
        /// 1-based line number of the bad entry.
        line: usize,
        /// Parser message.
        message: String,
    },

    /// Another process holds the store directory.
    #[error("store at {path:?} is locked by another process")]
    Locked {
        /// The locked store directory.
        path: PathBuf,
    },
}
