//! Cursor pagination over a remote listing.

use crate::error::{SyncError, SyncResult};
use crate::item::{ListPage, ListParams, SyncItem};
use crate::remote::RemoteLister;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Walks a remote listing page by page, threading the cursor and enforcing
/// the item cap.
///
/// Each call to [`next_page`](Self::next_page) issues at most one request.
/// The request limit never exceeds the number of items still allowed under
/// the cap, and a page that overshoots is truncated.
pub struct CursorPaginator<'a> {
    remote: &'a dyn RemoteLister,
    collection: &'a str,
    filter: BTreeMap<String, Value>,
    page_size: u32,
    item_cap: Option<usize>,
    timeout: Option<Duration>,
    cursor: Option<String>,
    collected: usize,
    pages: u32,
    has_more: bool,
    cut_created: Option<i64>,
}

impl<'a> CursorPaginator<'a> {
    /// Creates a paginator starting from the beginning of the listing.
    pub fn new(
        remote: &'a dyn RemoteLister,
        collection: &'a str,
        filter: BTreeMap<String, Value>,
        page_size: u32,
        item_cap: Option<usize>,
    ) -> Self {
        Self {
            remote,
            collection,
            filter,
            page_size,
            item_cap,
            timeout: None,
            cursor: None,
            collected: 0,
            pages: 0,
            has_more: true,
            cut_created: None,
        }
    }

    /// Bounds every request by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pages fetched so far.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Items yielded so far.
    pub fn collected(&self) -> usize {
        self.collected
    }

    /// Lowest `created` that the cap may have left unsynced on the last page.
    ///
    /// Set when the cap ended the listing early: either the page was
    /// truncated, or the remote still had more. The watermark must stay below
    /// this value, or a later pass filtering on `created > watermark` could
    /// skip items that share it.
    pub fn cut_created(&self) -> Option<i64> {
        self.cut_created
    }

    /// Returns true once no further request will be made.
    pub fn is_exhausted(&self) -> bool {
        !self.has_more || self.remaining() == Some(0)
    }

    fn remaining(&self) -> Option<usize> {
        self.item_cap.map(|cap| cap.saturating_sub(self.collected))
    }

    /// Parameters for the next request.
    pub fn next_params(&self) -> ListParams {
        let limit = match self.remaining() {
            Some(remaining) => u32::try_from(remaining)
                .unwrap_or(u32::MAX)
                .min(self.page_size),
            None => self.page_size,
        };
        ListParams {
            filter: self.filter.clone(),
            limit,
            starting_after: self.cursor.clone(),
        }
    }

    /// Fetches the next page, or `None` once exhausted.
    ///
    /// An empty page that still reports more data is a protocol violation,
    /// since following it would loop forever.
    pub async fn next_page(&mut self) -> SyncResult<Option<Vec<SyncItem>>> {
        if self.is_exhausted() {
            return Ok(None);
        }

        let params = self.next_params();
        let ListPage { mut items, has_more } = self.fetch(&params).await?;
        self.pages += 1;

        if items.is_empty() && has_more {
            return Err(SyncError::ProtocolViolation {
                collection: self.collection.to_string(),
                page: self.pages,
            });
        }

        if let Some(last) = items.last() {
            self.cursor = Some(last.id.clone());
        }
        self.cut_created = None;
        if let Some(remaining) = self.remaining() {
            if items.len() >= remaining {
                let dropped = items.split_off(remaining);
                // unseen items may share the last timestamp of this page
                let unseen = if has_more {
                    items.iter().filter_map(|item| item.created).max()
                } else {
                    None
                };
                self.cut_created = dropped
                    .iter()
                    .filter_map(|item| item.created)
                    .chain(unseen)
                    .min();
            }
        }
        self.collected += items.len();
        self.has_more = has_more;

        Ok(Some(items))
    }

    async fn fetch(&self, params: &ListParams) -> SyncResult<ListPage> {
        let request = self.remote.list(params);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| SyncError::Timeout {
                    collection: self.collection.to_string(),
                })?,
            None => request.await,
        };

        result.map_err(|source| SyncError::Remote {
            remote: self.remote.name().to_string(),
            collection: self.collection.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryRemote, RemoteError};
    use async_trait::async_trait;

    fn remote(n: usize) -> MemoryRemote {
        let items = (1..=n)
            .map(|i| SyncItem::new(format!("item_{i:03}"), i as i64))
            .collect();
        MemoryRemote::new("memory", items)
    }

    async fn drain(paginator: &mut CursorPaginator<'_>) -> Vec<Vec<SyncItem>> {
        let mut pages = Vec::new();
        while let Some(page) = paginator.next_page().await.unwrap() {
            pages.push(page);
        }
        pages
    }

    #[tokio::test]
    async fn walks_all_pages() {
        let remote = remote(250);
        let mut paginator = CursorPaginator::new(&remote, "products", BTreeMap::new(), 100, None);

        let pages = drain(&mut paginator).await;
        let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(paginator.collected(), 250);
        assert_eq!(paginator.pages(), 3);
    }

    #[tokio::test]
    async fn threads_cursor_from_last_item() {
        let remote = remote(5);
        let mut paginator = CursorPaginator::new(&remote, "products", BTreeMap::new(), 2, None);
        drain(&mut paginator).await;

        let cursors: Vec<Option<String>> = remote
            .requests()
            .into_iter()
            .map(|r| r.starting_after)
            .collect();
        assert_eq!(
            cursors,
            vec![None, Some("item_002".into()), Some("item_004".into())]
        );
    }

    #[tokio::test]
    async fn cap_shrinks_request_limit() {
        let remote = remote(250);
        let mut paginator =
            CursorPaginator::new(&remote, "products", BTreeMap::new(), 100, Some(150));

        let pages = drain(&mut paginator).await;
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 150);

        let limits: Vec<u32> = remote.requests().iter().map(|r| r.limit).collect();
        assert_eq!(limits, vec![100, 50]);
    }

    #[tokio::test]
    async fn zero_cap_makes_no_request() {
        let remote = remote(10);
        let mut paginator = CursorPaginator::new(&remote, "products", BTreeMap::new(), 100, Some(0));
        assert!(paginator.next_page().await.unwrap().is_none());
        assert_eq!(remote.call_count(), 0);
    }

    /// Ignores the requested limit and always serves a fixed page.
    struct Oversized;

    #[async_trait]
    impl RemoteLister for Oversized {
        fn name(&self) -> &str {
            "oversized"
        }

        async fn list(&self, _params: &ListParams) -> Result<ListPage, RemoteError> {
            let items = (0..10).map(|i| SyncItem::new(format!("o{i}"), i)).collect();
            Ok(ListPage::new(items, true))
        }
    }

    #[tokio::test]
    async fn truncates_oversized_page_at_cap() {
        let mut paginator = CursorPaginator::new(&Oversized, "products", BTreeMap::new(), 100, Some(3));
        let page = paginator.next_page().await.unwrap().unwrap();
        assert_eq!(page.len(), 3);
        assert!(paginator.is_exhausted());
        assert!(paginator.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cap_reports_cut_timestamp() {
        let mut paginator = CursorPaginator::new(&Oversized, "products", BTreeMap::new(), 100, Some(3));
        paginator.next_page().await.unwrap();
        assert_eq!(paginator.cut_created(), Some(2));

        let listing = remote(10);
        let mut paginator = CursorPaginator::new(&listing, "products", BTreeMap::new(), 4, Some(6));
        paginator.next_page().await.unwrap();
        assert_eq!(paginator.cut_created(), None);
        paginator.next_page().await.unwrap();
        assert_eq!(paginator.cut_created(), Some(6));

        let exact = remote(3);
        let mut paginator = CursorPaginator::new(&exact, "products", BTreeMap::new(), 100, Some(3));
        paginator.next_page().await.unwrap();
        assert_eq!(paginator.cut_created(), None);
    }

    #[tokio::test]
    async fn empty_page_with_more_is_violation() {
        let remote = remote(10);
        remote.empty_page_on_call(2);
        let mut paginator = CursorPaginator::new(&remote, "products", BTreeMap::new(), 5, None);

        assert!(paginator.next_page().await.unwrap().is_some());
        let err = paginator.next_page().await.unwrap_err();
        assert!(matches!(err, SyncError::ProtocolViolation { page: 2, .. }));
    }

    #[tokio::test]
    async fn empty_final_page_ends_cleanly() {
        let remote = remote(0);
        let mut paginator = CursorPaginator::new(&remote, "products", BTreeMap::new(), 100, None);
        assert_eq!(paginator.next_page().await.unwrap(), Some(Vec::new()));
        assert!(paginator.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remote_errors_are_wrapped() {
        let remote = remote(10);
        remote.fail_on_call(1, RemoteError::fatal("invalid api key").with_status(401));
        let mut paginator = CursorPaginator::new(&remote, "prices", BTreeMap::new(), 100, None);

        match paginator.next_page().await.unwrap_err() {
            SyncError::Remote {
                remote,
                collection,
                source,
            } => {
                assert_eq!(remote, "memory");
                assert_eq!(collection, "prices");
                assert_eq!(source.status, Some(401));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Never answers.
    struct Hanging;

    #[async_trait]
    impl RemoteLister for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn list(&self, _params: &ListParams) -> Result<ListPage, RemoteError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_aborts_request() {
        let mut paginator = CursorPaginator::new(&Hanging, "products", BTreeMap::new(), 100, None)
            .with_timeout(Some(Duration::from_secs(5)));
        assert!(matches!(
            paginator.next_page().await,
            Err(SyncError::Timeout { .. })
        ));
    }
}
