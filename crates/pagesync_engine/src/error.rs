//! Error types for the sync engine.

use crate::normalize::NormalizeError;
use crate::remote::RemoteError;
use pagesync_codec::CodecError;
use pagesync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync pass.
///
/// Remote failures are wrapped with the collection being synced; schema,
/// storage and codec failures pass through unchanged.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote listing call failed.
    #[error("{remote} API error while syncing {collection}: {source}")]
    Remote {
        /// Remote name, e.g. "stripe".
        remote: String,
        /// Collection being synced.
        collection: String,
        /// The remote's error.
        source: RemoteError,
    },

    /// The remote listing call exceeded the configured request timeout.
    #[error("remote request timed out while syncing {collection}")]
    Timeout {
        /// Collection being synced.
        collection: String,
    },

    /// The remote returned an empty page while claiming more data.
    #[error("protocol violation while syncing {collection}: page {page} was empty but has_more was set")]
    ProtocolViolation {
        /// Collection being synced.
        collection: String,
        /// 1-based page number.
        page: u32,
    },

    /// An item failed schema normalization.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// The content or metadata store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Normalized data could not be digested.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A stored watermark is not an integer timestamp.
    #[error("stored watermark {key} is not an integer: {value:?}")]
    InvalidWatermark {
        /// Metadata key.
        key: String,
        /// The stored value.
        value: String,
    },

    /// Configuration rejected before any request was made.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Returns true if re-running the pass may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote { source, .. } => source.retryable,
            SyncError::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        let transient = SyncError::Remote {
            remote: "stripe".into(),
            collection: "products".into(),
            source: RemoteError::transient("connection reset"),
        };
        assert!(transient.is_retryable());

        let fatal = SyncError::Remote {
            remote: "stripe".into(),
            collection: "products".into(),
            source: RemoteError::fatal("invalid api key").with_status(401),
        };
        assert!(!fatal.is_retryable());

        assert!(SyncError::Timeout {
            collection: "products".into()
        }
        .is_retryable());
        assert!(!SyncError::ProtocolViolation {
            collection: "products".into(),
            page: 2
        }
        .is_retryable());
    }

    #[test]
    fn remote_error_carries_context() {
        let err = SyncError::Remote {
            remote: "stripe".into(),
            collection: "prices".into(),
            source: RemoteError::transient("rate limited"),
        };
        assert_eq!(
            err.to_string(),
            "stripe API error while syncing prices: rate limited"
        );
    }

    #[test]
    fn normalize_error_is_not_wrapped() {
        let inner = NormalizeError::new("prod_1", "missing field `name`");
        let expected = inner.to_string();
        let err = SyncError::from(inner);
        assert_eq!(err.to_string(), expected);
    }
}
