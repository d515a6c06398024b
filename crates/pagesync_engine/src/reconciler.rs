//! Per-item reconciliation into the content store.

use crate::error::SyncResult;
use crate::item::SyncItem;
use crate::normalize::SchemaNormalizer;
use crate::render::Renderer;
use pagesync_codec::Digester;
use pagesync_storage::{ContentStore, StoreRecord};
use tracing::debug;

/// Normalizes, digests, optionally renders and upserts one item at a time.
pub struct RecordReconciler<'a> {
    normalizer: &'a dyn SchemaNormalizer,
    digester: &'a dyn Digester,
    store: &'a dyn ContentStore,
    renderer: Option<&'a dyn Renderer>,
}

impl<'a> RecordReconciler<'a> {
    /// Creates a reconciler without a renderer.
    pub fn new(
        normalizer: &'a dyn SchemaNormalizer,
        digester: &'a dyn Digester,
        store: &'a dyn ContentStore,
    ) -> Self {
        Self {
            normalizer,
            digester,
            store,
            renderer: None,
        }
    }

    /// Attaches an HTML renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Option<&'a dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Reconciles one item, returning whether the stored record changed.
    pub async fn reconcile(&self, item: &SyncItem) -> SyncResult<bool> {
        let data = self.normalizer.normalize(item)?;
        let digest = self.digester.digest(&data)?;

        let mut record = StoreRecord::new(item.id.clone(), data, digest);
        if let Some(html) = self.renderer.and_then(|r| r.render(item)) {
            record = record.with_rendered(html);
        }

        let changed = self.store.upsert(record).await?;
        if changed {
            debug!(id = %item.id, "updated item");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::normalize::{PassthroughNormalizer, RequiredFields};
    use crate::render::DescriptionRenderer;
    use pagesync_codec::CanonicalSha256;
    use pagesync_storage::MemoryStore;

    fn item() -> SyncItem {
        SyncItem::new("prod_1", 10)
            .with_field("name", "Mug")
            .with_field("description", "Holds coffee")
    }

    #[tokio::test]
    async fn first_sight_changes_then_stable() {
        let store = MemoryStore::new();
        let reconciler = RecordReconciler::new(&PassthroughNormalizer, &CanonicalSha256, &store);

        assert!(reconciler.reconcile(&item()).await.unwrap());
        assert!(!reconciler.reconcile(&item()).await.unwrap());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn payload_edit_changes() {
        let store = MemoryStore::new();
        let reconciler = RecordReconciler::new(&PassthroughNormalizer, &CanonicalSha256, &store);

        reconciler.reconcile(&item()).await.unwrap();
        let edited = item().with_field("name", "Big Mug");
        assert!(reconciler.reconcile(&edited).await.unwrap());

        let stored = store.record("prod_1").await.unwrap().unwrap();
        assert_eq!(stored.data["name"], "Big Mug");
    }

    #[tokio::test]
    async fn renderer_output_is_stored() {
        let store = MemoryStore::new();
        let renderer = DescriptionRenderer::new();
        let reconciler = RecordReconciler::new(&PassthroughNormalizer, &CanonicalSha256, &store)
            .with_renderer(Some(&renderer));

        reconciler.reconcile(&item()).await.unwrap();
        let stored = store.record("prod_1").await.unwrap().unwrap();
        assert_eq!(
            stored.rendered.map(|r| r.html).as_deref(),
            Some("<p>Holds coffee</p>")
        );
    }

    #[tokio::test]
    async fn normalize_failure_writes_nothing() {
        let store = MemoryStore::new();
        let normalizer = RequiredFields::new(["price"]);
        let reconciler = RecordReconciler::new(&normalizer, &CanonicalSha256, &store);

        let err = reconciler.reconcile(&item()).await.unwrap_err();
        assert!(matches!(err, SyncError::Normalize(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let reconciler = RecordReconciler::new(&PassthroughNormalizer, &CanonicalSha256, &store);

        assert!(matches!(
            reconciler.reconcile(&item()).await,
            Err(SyncError::Storage(_))
        ));
    }
}
