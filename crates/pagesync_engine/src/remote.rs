//! Remote listing abstraction.

use crate::item::{ListPage, ListParams, SyncItem};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// An error returned by a remote listing call.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct RemoteError {
    /// Human-readable message from the remote.
    pub message: String,
    /// HTTP-like status code, if the remote reported one.
    pub status: Option<u16>,
    /// Whether the failure is transient.
    pub retryable: bool,
}

impl RemoteError {
    /// A transient failure such as a dropped connection or rate limit.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retryable: true,
        }
    }

    /// A permanent failure such as bad credentials or an unknown cursor.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retryable: false,
        }
    }

    /// Attaches a status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// A remote that lists items in stable order with cursor pagination.
///
/// Implementations must return items in a stable order across calls and
/// honor `starting_after` as "items strictly after this id".
#[async_trait]
pub trait RemoteLister: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Lists one page.
    async fn list(&self, params: &ListParams) -> Result<ListPage, RemoteError>;
}

/// An in-memory remote that serves a fixed item list.
///
/// Supports `created.gt` and top-level equality filters, records every
/// request, and can be scripted to fail or misbehave on a given call.
#[derive(Debug)]
pub struct MemoryRemote {
    name: String,
    items: RwLock<Vec<SyncItem>>,
    requests: Mutex<Vec<ListParams>>,
    calls: AtomicUsize,
    failure: Mutex<Option<(usize, RemoteError)>>,
    empty_page_on: Mutex<Option<usize>>,
}

impl MemoryRemote {
    /// Creates a remote serving `items` in the given order.
    pub fn new(name: impl Into<String>, items: Vec<SyncItem>) -> Self {
        Self {
            name: name.into(),
            items: RwLock::new(items),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            empty_page_on: Mutex::new(None),
        }
    }

    /// Replaces an item with the same id, or appends it.
    pub fn upsert_item(&self, item: SyncItem) {
        let mut items = self.items.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Fails the `call`-th request (1-based) with `error`.
    pub fn fail_on_call(&self, call: usize, error: RemoteError) {
        *self.failure.lock() = Some((call, error));
    }

    /// Answers the `call`-th request (1-based) with an empty page that
    /// claims more data.
    pub fn empty_page_on_call(&self, call: usize) {
        *self.empty_page_on.lock() = Some(call);
    }

    /// Clears scripted failures.
    pub fn clear_script(&self) {
        *self.failure.lock() = None;
        *self.empty_page_on.lock() = None;
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<ListParams> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn matches(item: &SyncItem, params: &ListParams) -> bool {
        params.filter.iter().all(|(key, expected)| {
            if key == crate::item::CREATED_KEY {
                return match (params.created_after(), item.created) {
                    (Some(after), Some(created)) => created > after,
                    (Some(_), None) => false,
                    (None, _) => true,
                };
            }
            item.field(key).as_ref() == Some(expected)
        })
    }
}

#[async_trait]
impl RemoteLister for MemoryRemote {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, params: &ListParams) -> Result<ListPage, RemoteError> {
        self.requests.lock().push(params.clone());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((_, error)) = self.failure.lock().as_ref().filter(|(n, _)| *n == call) {
            return Err(error.clone());
        }
        if *self.empty_page_on.lock() == Some(call) {
            return Ok(ListPage::new(Vec::new(), true));
        }

        let items = self.items.read();
        let matching: Vec<&SyncItem> = items
            .iter()
            .filter(|item| Self::matches(item, params))
            .collect();

        let start = match &params.starting_after {
            Some(cursor) => match matching.iter().position(|item| &item.id == cursor) {
                Some(pos) => pos + 1,
                None => {
                    return Err(RemoteError::fatal(format!("No such object: '{cursor}'"))
                        .with_status(400))
                }
            },
            None => 0,
        };

        let limit = params.limit.clamp(1, crate::config::MAX_PAGE_SIZE) as usize;
        let end = (start + limit).min(matching.len());
        let page: Vec<SyncItem> = matching[start..end].iter().map(|&item| item.clone()).collect();

        Ok(ListPage::new(page, end < matching.len()))
    }
}
