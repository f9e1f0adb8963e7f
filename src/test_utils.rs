//! Shared helpers for unit tests.
#![cfg(test)]

use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

use crate::store::{
    ContentFilter,
    ContentStore,
    MemoryStore,
    StoreError,
};
use crate::types::{
    ContentEntry,
    EntryId,
    NewContentEntry,
};

/// Store wrapper that fails chosen calls and delegates the rest.
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    pub(crate) inner: MemoryStore,
    /// Every `fetch` fails.
    fail_fetch: bool,
    /// Zero-based `delete_ids` calls that fail.
    failing_deletes: Vec<usize>,
    delete_calls: AtomicUsize,
}

impl FailingStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self { inner, ..Self::default() }
    }

    pub(crate) fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub(crate) fn failing_deletes(mut self, calls: &[usize]) -> Self {
        self.failing_deletes = calls.to_vec();
        self
    }
}

fn injected() -> StoreError {
    StoreError::NotFound(EntryId(-1))
}

impl ContentStore for FailingStore {
    async fn fetch(&self, filter: &ContentFilter) -> Result<Vec<ContentEntry>, StoreError> {
        if self.fail_fetch {
            return Err(injected());
        }
        self.inner.fetch(filter).await
    }

    async fn upsert(&self, entries: &[NewContentEntry]) -> Result<usize, StoreError> {
        self.inner.upsert(entries).await
    }

    async fn update_key(&self, id: EntryId, key: &str) -> Result<(), StoreError> {
        self.inner.update_key(id, key).await
    }

    async fn delete_ids(&self, ids: &[EntryId]) -> Result<usize, StoreError> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.contains(&call) {
            return Err(injected());
        }
        self.inner.delete_ids(ids).await
    }

    async fn delete_where(&self, filter: &ContentFilter) -> Result<usize, StoreError> {
        self.inner.delete_where(filter).await
    }
}
