//! Test fixtures and store helpers.
//!
//! Provides sample catalog data and ready-made sync contexts over memory and
//! file backends.

use pagesync_engine::{SyncContext, SyncItem};
use pagesync_storage::{FileStore, FileStoreConfig, MemoryStore, StoreRecord};
use std::sync::Arc;
use tempfile::TempDir;

/// Creation time of the first fixture item.
pub const BASE_CREATED: i64 = 1_700_000_000;

/// Seconds between consecutive fixture items.
pub const CREATED_STEP: i64 = 60;

/// Creation time of the `index`-th fixture item (0-based).
pub fn created_at(index: usize) -> i64 {
    BASE_CREATED + index as i64 * CREATED_STEP
}

/// A product catalog of `count` items with strictly increasing `created`.
pub fn catalog(count: usize) -> Vec<SyncItem> {
    (0..count).map(product).collect()
}

/// The `index`-th catalog product.
pub fn product(index: usize) -> SyncItem {
    SyncItem::new(format!("prod_{index:04}"), created_at(index))
        .with_field("object", "product")
        .with_field("name", format!("Product {index}"))
        .with_field("description", format!("Description of product {index}."))
        .with_field("active", index % 5 != 0)
}

/// `count` prices, one per catalog product.
pub fn prices(count: usize) -> Vec<SyncItem> {
    (0..count)
        .map(|index| {
            SyncItem::new(format!("price_{index:04}"), created_at(index))
                .with_field("object", "price")
                .with_field("product", format!("prod_{index:04}"))
                .with_field("currency", "usd")
                .with_field("unit_amount", 100 + index as i64 * 25)
        })
        .collect()
}

enum Backend {
    Memory(Arc<MemoryStore>),
    File(Arc<FileStore>),
}

/// A sync context with automatic cleanup.
pub struct TestContext {
    /// The context to hand to passes and engines.
    pub ctx: SyncContext,
    backend: Backend,
    _temp_dir: Option<TempDir>,
}

impl TestContext {
    /// Creates a context over a fresh in-memory store.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            ctx: SyncContext::from_store(store.clone()),
            backend: Backend::Memory(store),
            _temp_dir: None,
        }
    }

    /// Creates a context over a file store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(
            FileStore::open(temp_dir.path(), FileStoreConfig::default().sync_on_write(false))
                .expect("Failed to open file store"),
        );
        Self {
            ctx: SyncContext::from_store(store.clone()),
            backend: Backend::File(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Closes and reopens a file-backed context, replaying its journal.
    ///
    /// In-memory contexts are returned unchanged.
    pub fn reopen(self) -> Self {
        let Self {
            ctx,
            backend,
            _temp_dir: temp_dir,
        } = self;
        let Some(temp_dir) = temp_dir else {
            return Self {
                ctx,
                backend,
                _temp_dir: None,
            };
        };

        drop(ctx);
        drop(backend);
        let store = Arc::new(
            FileStore::open(temp_dir.path(), FileStoreConfig::default().sync_on_write(false))
                .expect("Failed to reopen file store"),
        );
        Self {
            ctx: SyncContext::from_store(store.clone()),
            backend: Backend::File(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// The in-memory store, if this context uses one.
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &self.backend {
            Backend::Memory(store) => Some(store.as_ref()),
            Backend::File(_) => None,
        }
    }

    /// The file store, if this context uses one.
    pub fn file_store(&self) -> Option<&FileStore> {
        match &self.backend {
            Backend::File(store) => Some(store.as_ref()),
            Backend::Memory(_) => None,
        }
    }

    /// All stored records, sorted by id.
    pub fn records(&self) -> Vec<StoreRecord> {
        match &self.backend {
            Backend::Memory(store) => store.records(),
            Backend::File(store) => store.records(),
        }
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        match &self.backend {
            Backend::Memory(store) => store.len(),
            Backend::File(store) => store.record_count(),
        }
    }

    /// Looks up one stored record.
    pub async fn record(&self, id: &str) -> Option<StoreRecord> {
        self.ctx.store.record(id).await.expect("record lookup failed")
    }

    /// Reads a stored watermark.
    pub async fn watermark(&self, key: &str) -> Option<String> {
        self.ctx.meta.get(key).await.expect("metadata lookup failed")
    }

    /// Overwrites a stored watermark.
    pub async fn set_watermark(&self, key: &str, value: &str) {
        self.ctx
            .meta
            .set(key, value)
            .await
            .expect("metadata write failed");
    }
}

/// Runs a future to completion on a fresh current-thread runtime.
///
/// For property tests, whose bodies are synchronous.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_strictly_increasing() {
        let items = catalog(10);
        assert_eq!(items.len(), 10);
        assert!(items.windows(2).all(|w| w[0].created < w[1].created));
        assert_eq!(items[3].id, "prod_0003");
    }

    #[test]
    fn prices_reference_products() {
        let items = prices(3);
        assert_eq!(items[2].payload["product"], "prod_0002");
    }

    #[test]
    fn file_context_reopens() {
        let ctx = TestContext::file();
        block_on(ctx.set_watermark("k", "1"));
        let ctx = ctx.reopen();
        assert_eq!(block_on(ctx.watermark("k")).as_deref(), Some("1"));
        assert!(ctx.file_store().is_some());
    }

    #[test]
    fn memory_context_starts_empty() {
        let ctx = TestContext::memory();
        assert_eq!(ctx.record_count(), 0);
        assert!(ctx.memory_store().is_some());
    }
}
