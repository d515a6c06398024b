//! Store trait definitions.

use crate::error::StorageResult;
use crate::record::StoreRecord;
use async_trait::async_trait;

/// A content store holding synchronized records keyed by id.
///
/// # Invariants
///
/// - `upsert` returns `true` if and only if no record existed for the id or
///   the stored digest differs from the incoming one
/// - An upsert that returns `false` leaves the store untouched
/// - Records are never deleted by the sync core
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For tests and ephemeral runs
/// - [`super::FileStore`] - Journaled on-disk storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Inserts or replaces a record, gated on its digest.
    ///
    /// Returns whether the stored state changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    async fn upsert(&self, record: StoreRecord) -> StorageResult<bool>;

    /// Fetches the stored record for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn record(&self, id: &str) -> StorageResult<Option<StoreRecord>>;
}

/// Key/value metadata owned by the store, used for watermarks.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Overwrites the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}
