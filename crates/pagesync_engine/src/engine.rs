//! Engine running passes over collections.

use crate::collection::Collection;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::pass::{PassSummary, SyncContext};
use parking_lot::RwLock;
use std::time::SystemTime;
use tracing::{info, warn};

/// Cumulative statistics across passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes that finished.
    pub passes_completed: u64,
    /// Passes that aborted.
    pub passes_failed: u64,
    /// Items reconciled, including by aborted passes.
    pub items_processed: u64,
    /// Items whose stored record changed.
    pub items_changed: u64,
    /// Retries performed by [`SyncEngine::sync_with_retry`].
    pub retries: u64,
    /// When the last pass finished.
    pub last_sync_time: Option<SystemTime>,
    /// Last error message.
    pub last_error: Option<String>,
    /// Summary of the last successful pass.
    pub last_pass: Option<PassSummary>,
}

/// Runs sync passes against a shared store context.
///
/// The engine itself holds no per-pass state, so one engine can sync any
/// number of collections sequentially.
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use pagesync_engine::{Collection, MemoryRemote, QueryFilter, SyncConfig, SyncContext, SyncEngine, SyncItem};
/// use pagesync_storage::MemoryStore;
/// use std::sync::Arc;
///
/// let remote = Arc::new(MemoryRemote::new("memory", vec![SyncItem::new("prod_1", 1_700_000_000)]));
/// let engine = SyncEngine::new(
///     SyncConfig::new(),
///     SyncContext::from_store(Arc::new(MemoryStore::new())),
/// );
///
/// let summary = engine
///     .sync(&Collection::products(remote, QueryFilter::new()))
///     .await
///     .unwrap();
/// assert_eq!(summary.changed, 1);
/// # }
/// ```
pub struct SyncEngine {
    config: SyncConfig,
    ctx: SyncContext,
    stats: RwLock<SyncStats>,
}

impl SyncEngine {
    /// Creates an engine.
    pub fn new(config: SyncConfig, ctx: SyncContext) -> Self {
        Self {
            config,
            ctx,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Snapshot of cumulative statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Runs one pass over `collection`.
    pub async fn sync(&self, collection: &Collection) -> SyncResult<PassSummary> {
        let mut pass = collection.pass(&self.ctx, &self.config);
        let result = pass.run().await;

        let mut stats = self.stats.write();
        stats.items_processed += pass.processed().len() as u64;
        stats.items_changed += pass.changed() as u64;
        match &result {
            Ok(summary) => {
                stats.passes_completed += 1;
                stats.last_sync_time = Some(SystemTime::now());
                stats.last_error = None;
                stats.last_pass = Some(summary.clone());
            }
            Err(error) => {
                stats.passes_failed += 1;
                stats.last_error = Some(error.to_string());
            }
        }
        result
    }

    /// Runs a pass, re-running it from the stored watermark on transient
    /// errors.
    ///
    /// A re-run resumes after the last committed page. Items already written
    /// are digest-gated, so repeating them is harmless.
    pub async fn sync_with_retry(&self, collection: &Collection) -> SyncResult<PassSummary> {
        let retry = &self.config.retry;
        let mut last_error = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                let delay = retry.delay_for_attempt(attempt);
                info!(
                    collection = collection.name(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying sync pass"
                );
                tokio::time::sleep(delay).await;
                self.stats.write().retries += 1;
            }

            match self.sync(collection).await {
                Ok(summary) => return Ok(summary),
                Err(error) if error.is_retryable() && attempt + 1 < retry.max_attempts => {
                    warn!(collection = collection.name(), %error, "transient sync failure");
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SyncError::InvalidConfig("retry.max_attempts must be at least 1".into())
        }))
    }

    /// Syncs each collection in order, stopping at the first failure.
    pub async fn sync_all(&self, collections: &[Collection]) -> SyncResult<Vec<PassSummary>> {
        let mut summaries = Vec::with_capacity(collections.len());
        for collection in collections {
            summaries.push(self.sync(collection).await?);
        }
        Ok(summaries)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("stats", &*self.stats.read())
            .finish_non_exhaustive()
    }
}
