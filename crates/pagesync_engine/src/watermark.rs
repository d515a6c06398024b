//! Per-collection incremental watermark.

use crate::error::{SyncError, SyncResult};
use pagesync_storage::MetadataStore;

/// Reads and advances the high-water mark for one collection.
///
/// The mark is the largest `created` timestamp among reconciled items,
/// stored as a decimal string under the collection's metadata key. It never
/// moves backwards. Callers leave out timestamps an item cap may have split,
/// see [`CursorPaginator::cut_created`](crate::CursorPaginator::cut_created).
pub struct WatermarkTracker<'a> {
    meta: &'a dyn MetadataStore,
    key: &'a str,
    current: Option<i64>,
}

impl<'a> WatermarkTracker<'a> {
    /// Loads the current watermark for `key`.
    ///
    /// A stored value that does not parse as an integer is an error rather
    /// than a full resync.
    pub async fn read(meta: &'a dyn MetadataStore, key: &'a str) -> SyncResult<Self> {
        let current = match meta.get(key).await? {
            Some(value) => Some(value.trim().parse::<i64>().map_err(|_| {
                SyncError::InvalidWatermark {
                    key: key.to_string(),
                    value: value.clone(),
                }
            })?),
            None => None,
        };
        Ok(Self { meta, key, current })
    }

    /// The watermark as last read or written.
    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// Advances the watermark past a page of reconciled items.
    ///
    /// Items without a timestamp are ignored. If none carry one, nothing is
    /// written.
    pub async fn advance<I>(&mut self, created: I) -> SyncResult<Option<i64>>
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        let Some(page_max) = created.into_iter().flatten().max() else {
            return Ok(self.current);
        };

        let next = self.current.map_or(page_max, |prev| prev.max(page_max));
        self.meta.set(self.key, &next.to_string()).await?;
        self.current = Some(next);
        Ok(self.current)
    }
}
