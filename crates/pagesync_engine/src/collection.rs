//! Named collections bound to a remote and a watermark key.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::item::QueryFilter;
use crate::pass::{PassSummary, SyncContext, SyncPass};
use crate::remote::RemoteLister;
use crate::render::Renderer;
use std::sync::Arc;

/// Watermark key for the product catalog.
pub const PRODUCTS_WATERMARK_KEY: &str = "products-last-updated";

/// Watermark key for prices.
pub const PRICES_WATERMARK_KEY: &str = "prices-last-updated";

/// A remote collection synced as a unit.
///
/// Each collection owns its watermark key, so collections sharing a
/// metadata store advance independently.
#[derive(Clone)]
pub struct Collection {
    name: String,
    watermark_key: String,
    remote: Arc<dyn RemoteLister>,
    filter: QueryFilter,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Collection {
    /// Creates a collection with an explicit watermark key.
    pub fn new(
        name: impl Into<String>,
        watermark_key: impl Into<String>,
        remote: Arc<dyn RemoteLister>,
        filter: QueryFilter,
    ) -> Self {
        Self {
            name: name.into(),
            watermark_key: watermark_key.into(),
            remote,
            filter,
            renderer: None,
        }
    }

    /// Creates a collection keyed `<name>-last-updated`.
    pub fn named(name: impl Into<String>, remote: Arc<dyn RemoteLister>, filter: QueryFilter) -> Self {
        let name = name.into();
        let key = format!("{name}-last-updated");
        Self::new(name, key, remote, filter)
    }

    /// The product catalog.
    pub fn products(remote: Arc<dyn RemoteLister>, filter: QueryFilter) -> Self {
        Self::new("products", PRODUCTS_WATERMARK_KEY, remote, filter)
    }

    /// Prices.
    pub fn prices(remote: Arc<dyn RemoteLister>, filter: QueryFilter) -> Self {
        Self::new("prices", PRICES_WATERMARK_KEY, remote, filter)
    }

    /// Attaches an HTML renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata key holding this collection's watermark.
    pub fn watermark_key(&self) -> &str {
        &self.watermark_key
    }

    /// Prepares a pass over this collection.
    pub fn pass<'a>(&'a self, ctx: &'a SyncContext, config: &'a SyncConfig) -> SyncPass<'a> {
        let renderer: Option<&'a dyn Renderer> = match &self.renderer {
            Some(renderer) => Some(renderer.as_ref()),
            None => None,
        };
        SyncPass::new(ctx, self.remote.as_ref(), &self.filter, &self.watermark_key, config)
            .with_collection(&self.name)
            .with_renderer(renderer)
    }

    /// Runs one pass over this collection.
    pub async fn load(&self, ctx: &SyncContext, config: &SyncConfig) -> SyncResult<PassSummary> {
        self.pass(ctx, config).run().await
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("watermark_key", &self.watermark_key)
            .field("remote", &self.remote.name())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
