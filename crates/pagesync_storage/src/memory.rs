//! In-memory store for testing.

use crate::error::{StorageError, StorageResult};
use crate::record::StoreRecord;
use crate::store::{ContentStore, MetadataStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory content and metadata store.
///
/// This store keeps everything in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - One-off passes that don't need persistence
///
/// It counts every state-changing write so tests can assert that an
/// unchanged remote produces no mutations.
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use pagesync_codec::Digest;
/// use pagesync_storage::{ContentStore, MemoryStore, StoreRecord};
/// use serde_json::json;
///
/// let store = MemoryStore::new();
/// let record = StoreRecord::new("prod_1", json!({"name": "Mug"}), Digest::new("d1"));
/// assert!(store.upsert(record.clone()).await.unwrap());
/// assert!(!store.upsert(record).await.unwrap());
/// assert_eq!(store.write_count(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, StoreRecord>>,
    meta: RwLock<BTreeMap<String, String>>,
    writes: AtomicU64,
    read_only: AtomicBool,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of state-changing record writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns a snapshot of all records, sorted by id.
    pub fn records(&self) -> Vec<StoreRecord> {
        let mut records: Vec<StoreRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Returns a snapshot of all metadata.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.meta.read().clone()
    }

    /// Makes subsequent writes fail with a permission error.
    ///
    /// Useful for exercising storage failure paths.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory store is read-only",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn upsert(&self, record: StoreRecord) -> StorageResult<bool> {
        self.check_writable()?;

        let mut records = self.records.write();
        if records
            .get(&record.id)
            .is_some_and(|existing| existing.digest == record.digest)
        {
            return Ok(false);
        }

        records.insert(record.id.clone(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn record(&self, id: &str) -> StorageResult<Option<StoreRecord>> {
        Ok(self.records.read().get(id).cloned())
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.meta.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.meta.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
