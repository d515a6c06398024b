//! # Pagesync Storage
//!
//! Content store and metadata store backends for pagesync.
//!
//! The sync engine writes normalized records into a [`ContentStore`] and
//! keeps its per-collection watermarks in a [`MetadataStore`]. Both are
//! traits so the engine stays independent of where data lands.
//!
//! ## Design Principles
//!
//! - Change detection belongs to the store: `upsert` reports whether the
//!   stored digest actually changed
//! - Writes that change nothing are not persisted
//! - Stores must be `Send + Sync`; a single sync pass writes at a time
//!
//! ## Available Backends
//!
//! - [`MemoryStore`] - For testing and ephemeral runs
//! - [`FileStore`] - Journaled persistent storage with a directory lock

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod record;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::{CompactStats, FileStore, FileStoreConfig};
pub use memory::MemoryStore;
pub use record::{Rendered, StoreRecord};
pub use store::{ContentStore, MetadataStore};
