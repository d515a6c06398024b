//! A single incremental sync pass over one collection.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::item::{QueryFilter, SyncItem};
use crate::normalize::{PassthroughNormalizer, SchemaNormalizer};
use crate::paginator::CursorPaginator;
use crate::reconciler::RecordReconciler;
use crate::remote::RemoteLister;
use crate::render::Renderer;
use crate::watermark::WatermarkTracker;
use pagesync_codec::{CanonicalSha256, Digester};
use pagesync_storage::{ContentStore, MetadataStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Stores and codecs a pass writes through.
#[derive(Clone)]
pub struct SyncContext {
    /// Where reconciled records land.
    pub store: Arc<dyn ContentStore>,
    /// Where watermarks live.
    pub meta: Arc<dyn MetadataStore>,
    /// Maps remote items to stored data.
    pub normalizer: Arc<dyn SchemaNormalizer>,
    /// Computes change-detection digests.
    pub digester: Arc<dyn Digester>,
}

impl SyncContext {
    /// Creates a context with pass-through normalization and canonical digests.
    pub fn new(store: Arc<dyn ContentStore>, meta: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            meta,
            normalizer: Arc::new(PassthroughNormalizer),
            digester: Arc::new(CanonicalSha256),
        }
    }

    /// Creates a context over a backend that stores both content and metadata.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ContentStore + MetadataStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    /// Replaces the normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn SchemaNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replaces the digester.
    #[must_use]
    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext").finish_non_exhaustive()
    }
}

/// Where a pass is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    /// Created, nothing read yet.
    Init,
    /// A page request is outstanding or its items are being reconciled.
    Paging,
    /// The last page was reconciled and the watermark advanced.
    PageDone,
    /// Completed successfully.
    Finished,
    /// Aborted by an error.
    Failed,
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PassState::Init => "init",
            PassState::Paging => "paging",
            PassState::PageDone => "page_done",
            PassState::Finished => "finished",
            PassState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    /// Unique id of this pass, for correlating logs.
    pub run_id: Uuid,
    /// Collection label.
    pub collection: String,
    /// Pages fetched.
    pub pages: u32,
    /// Items reconciled.
    pub processed: usize,
    /// Items whose stored record changed.
    pub changed: usize,
    /// Watermark after the pass.
    pub watermark: Option<i64>,
    /// Wall-clock duration.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// One pass: read watermark, page through the remote, reconcile each item,
/// advance the watermark after every page.
///
/// A failure anywhere aborts the pass. Items reconciled before the failure
/// stay written and stay visible through [`processed`](Self::processed),
/// while the watermark is only as far as the last completed page.
pub struct SyncPass<'a> {
    ctx: &'a SyncContext,
    remote: &'a dyn RemoteLister,
    collection: &'a str,
    watermark_key: &'a str,
    filter: &'a QueryFilter,
    renderer: Option<&'a dyn Renderer>,
    config: &'a SyncConfig,
    run_id: Uuid,
    state: PassState,
    processed: Vec<SyncItem>,
    changed: usize,
    pages: u32,
    watermark: Option<i64>,
}

impl<'a> SyncPass<'a> {
    /// Prepares a pass. Nothing is read until [`run`](Self::run).
    pub fn new(
        ctx: &'a SyncContext,
        remote: &'a dyn RemoteLister,
        filter: &'a QueryFilter,
        watermark_key: &'a str,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            ctx,
            remote,
            collection: watermark_key,
            watermark_key,
            filter,
            renderer: None,
            config,
            run_id: Uuid::new_v4(),
            state: PassState::Init,
            processed: Vec::new(),
            changed: 0,
            pages: 0,
            watermark: None,
        }
    }

    /// Sets the collection label used in logs and errors.
    #[must_use]
    pub fn with_collection(mut self, collection: &'a str) -> Self {
        self.collection = collection;
        self
    }

    /// Attaches an HTML renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Option<&'a dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Items reconciled so far, in remote order.
    pub fn processed(&self) -> &[SyncItem] {
        &self.processed
    }

    /// Items whose stored record changed so far.
    pub fn changed(&self) -> usize {
        self.changed
    }

    /// Consumes the pass, returning the reconciled items.
    pub fn into_processed(self) -> Vec<SyncItem> {
        self.processed
    }

    /// Runs the pass to completion.
    #[tracing::instrument(
        name = "sync_pass",
        skip_all,
        fields(collection = %self.collection, run_id = %self.run_id)
    )]
    pub async fn run(&mut self) -> SyncResult<PassSummary> {
        let started = Instant::now();

        match self.drive().await {
            Ok(()) => {
                self.state = PassState::Finished;
                info!(
                    processed = self.processed.len(),
                    changed = self.changed,
                    pages = self.pages,
                    "finished loading {} items from {}",
                    self.processed.len(),
                    self.remote.name()
                );
                Ok(PassSummary {
                    run_id: self.run_id,
                    collection: self.collection.to_string(),
                    pages: self.pages,
                    processed: self.processed.len(),
                    changed: self.changed,
                    watermark: self.watermark,
                    duration: started.elapsed(),
                })
            }
            Err(error) => {
                self.state = PassState::Failed;
                warn!(
                    processed = self.processed.len(),
                    %error,
                    "sync pass aborted"
                );
                Err(error)
            }
        }
    }

    async fn drive(&mut self) -> SyncResult<()> {
        self.config.validate()?;
        let page_size = self.config.effective_page_size(self.filter.page_size)?;

        let ctx = self.ctx;
        let mut tracker = WatermarkTracker::read(ctx.meta.as_ref(), self.watermark_key).await?;
        self.watermark = tracker.current();

        let mut paginator = CursorPaginator::new(
            self.remote,
            self.collection,
            self.filter.incremental(tracker.current()),
            page_size,
            self.filter.item_cap,
        )
        .with_timeout(self.config.request_timeout);

        let reconciler = RecordReconciler::new(
            ctx.normalizer.as_ref(),
            ctx.digester.as_ref(),
            ctx.store.as_ref(),
        )
        .with_renderer(self.renderer);

        loop {
            self.state = PassState::Paging;
            let Some(page) = paginator.next_page().await? else {
                break;
            };

            let first = self.processed.len();
            for item in page {
                if reconciler.reconcile(&item).await? {
                    self.changed += 1;
                }
                self.processed.push(item);
            }

            let ceiling = paginator.cut_created();
            self.watermark = tracker
                .advance(self.processed[first..].iter().map(|item| {
                    item.created
                        .filter(|created| ceiling.is_none_or(|cut| *created < cut))
                }))
                .await?;
            self.pages = paginator.pages();
            self.state = PassState::PageDone;

            info!(
                "loaded {} items from {} so far",
                self.processed.len(),
                self.remote.name()
            );
        }

        Ok(())
    }
}

/// Runs one pass and returns the items it reconciled.
///
/// `watermark_key` doubles as the collection label. Use [`SyncPass`] directly
/// to observe progress or a partial result after a failure.
pub async fn sync_collection(
    remote: &dyn RemoteLister,
    filter: &QueryFilter,
    ctx: &SyncContext,
    watermark_key: &str,
    renderer: Option<&dyn Renderer>,
    config: &SyncConfig,
) -> SyncResult<Vec<SyncItem>> {
    let mut pass = SyncPass::new(ctx, remote, filter, watermark_key, config).with_renderer(renderer);
    pass.run().await?;
    Ok(pass.into_processed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::remote::{MemoryRemote, RemoteError};
    use pagesync_storage::MemoryStore;

    const KEY: &str = "products-last-updated";

    fn items(range: std::ops::RangeInclusive<i64>) -> Vec<SyncItem> {
        range
            .map(|i| SyncItem::new(format!("prod_{i:03}"), 1000 + i).with_field("name", format!("P{i}")))
            .collect()
    }

    #[tokio::test]
    async fn fresh_pass_syncs_everything() {
        let store = Arc::new(MemoryStore::new());
        let ctx = SyncContext::from_store(store.clone());
        let remote = MemoryRemote::new("memory", items(1..=5));
        let filter = QueryFilter::new();
        let config = SyncConfig::new().with_page_size(2);

        let mut pass = SyncPass::new(&ctx, &remote, &filter, KEY, &config);
        assert_eq!(pass.state(), PassState::Init);

        let summary = pass.run().await.unwrap();
        assert_eq!(pass.state(), PassState::Finished);
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.changed, 5);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.watermark, Some(1005));
        assert_eq!(summary.collection, KEY);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn failure_keeps_partial_progress() {
        let store = Arc::new(MemoryStore::new());
        let ctx = SyncContext::from_store(store.clone());
        let remote = MemoryRemote::new("memory", items(1..=6));
        remote.fail_on_call(2, RemoteError::transient("connection reset"));
        let filter = QueryFilter::new();
        let config = SyncConfig::new().with_page_size(3);

        let mut pass = SyncPass::new(&ctx, &remote, &filter, KEY, &config).with_collection("products");
        let err = pass.run().await.unwrap_err();

        assert!(matches!(err, SyncError::Remote { ref collection, .. } if collection == "products"));
        assert_eq!(pass.state(), PassState::Failed);
        assert_eq!(pass.processed().len(), 3);
        assert_eq!(store.get(KEY).await.unwrap().as_deref(), Some("1003"));
    }

    #[tokio::test]
    async fn invalid_config_makes_no_request() {
        let ctx = SyncContext::from_store(Arc::new(MemoryStore::new()));
        let remote = MemoryRemote::new("memory", items(1..=3));
        let filter = QueryFilter::new().with_page_size(0);
        let config = SyncConfig::new();

        let result = sync_collection(&remote, &filter, &ctx, KEY, None, &config).await;
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn sync_collection_returns_items_in_order() {
        let ctx = SyncContext::from_store(Arc::new(MemoryStore::new()));
        let remote = MemoryRemote::new("memory", items(1..=4));
        let filter = QueryFilter::new();
        let config = SyncConfig::new();

        let synced = sync_collection(&remote, &filter, &ctx, KEY, None, &config)
            .await
            .unwrap();
        let ids: Vec<&str> = synced.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["prod_001", "prod_002", "prod_003", "prod_004"]);
    }

    #[test]
    fn summary_serializes_duration_as_millis() {
        let summary = PassSummary {
            run_id: Uuid::nil(),
            collection: "products".into(),
            pages: 1,
            processed: 2,
            changed: 1,
            watermark: Some(5),
            duration: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["duration"], 1500);
        assert_eq!(json["watermark"], 5);
    }
}
