//! # Pagesync Engine
//!
//! Incremental, cursor-paginated sync of remote collections into a local
//! content store.
//!
//! This crate provides:
//! - A remote listing abstraction with cursor pagination
//! - A per-collection watermark that makes re-runs incremental
//! - Digest-gated reconciliation so unchanged items cause no writes
//! - A pass state machine (init → paging → page done → finished / failed)
//! - Caller-level retry with exponential backoff
//!
//! ## Pass Model
//!
//! A pass reads the collection's watermark, lists items created after it one
//! page at a time, reconciles every item into the content store and advances
//! the watermark after each page. The next pass starts where the last
//! committed page ended.
//!
//! ## Key Invariants
//!
//! - Never more than the item cap is reconciled per pass
//! - The watermark never decreases
//! - The watermark is written only after its page is fully reconciled
//! - Items whose normalized data is unchanged are not rewritten
//! - Any failure aborts the pass; partial progress stays committed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod engine;
mod error;
mod item;
mod normalize;
mod paginator;
mod pass;
mod reconciler;
mod remote;
mod render;
mod watermark;

pub use collection::{Collection, PRICES_WATERMARK_KEY, PRODUCTS_WATERMARK_KEY};
pub use config::{RetryConfig, SyncConfig, MAX_PAGE_SIZE};
pub use engine::{SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use item::{ListPage, ListParams, QueryFilter, SyncItem, CREATED_KEY};
pub use normalize::{NormalizeError, PassthroughNormalizer, RequiredFields, SchemaNormalizer};
pub use paginator::CursorPaginator;
pub use pass::{sync_collection, PassState, PassSummary, SyncContext, SyncPass};
pub use reconciler::RecordReconciler;
pub use remote::{MemoryRemote, RemoteError, RemoteLister};
pub use render::{DescriptionRenderer, Renderer};
pub use watermark::WatermarkTracker;
