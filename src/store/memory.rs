//! In-memory content store.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::{
    ContentEntry,
    ContentIdentity,
    EntryId,
    NewContentEntry,
};

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<EntryId, ContentEntry>,
    next_id: i64,
}

impl MemoryState {
    fn allocate(&mut self, entry: NewContentEntry) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        let NewContentEntry { page, section, key, locale, value } = entry;
        self.rows.insert(id, ContentEntry { id, page, section, key, locale, value });
        id
    }
}

/// Content store held in memory.
///
/// Cloning shares the same rows. Like the hosted table it replaces, it does
/// not reject duplicate identities on [`MemoryStore::insert_raw`], so legacy
/// data can be loaded and repaired.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows without the identity check, returning their ids.
    pub fn insert_raw(&self, entries: impl IntoIterator<Item = NewContentEntry>) -> Vec<EntryId> {
        let mut state = self.state.write();
        entries.into_iter().map(|entry| state.allocate(entry)).collect()
    }

    /// Current row count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every row in id order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ContentEntry> {
        self.state.read().rows.values().cloned().collect()
    }

    fn ids_at(state: &MemoryState, identity: &ContentIdentity) -> Vec<EntryId> {
        state.rows.values().filter(|row| row.has_identity(identity)).map(|row| row.id).collect()
    }
}

impl ContentStore for MemoryStore {
    async fn fetch(&self, filter: &ContentFilter) -> Result<Vec<ContentEntry>, StoreError> {
        let state = self.state.read();
        Ok(state.rows.values().filter(|row| filter.matches(row)).cloned().collect())
    }

    async fn upsert(&self, entries: &[NewContentEntry]) -> Result<usize, StoreError> {
        let mut state = self.state.write();
        for entry in entries {
            let ids = Self::ids_at(&state, &entry.identity());
            if ids.is_empty() {
                state.allocate(entry.clone());
                continue;
            }
            for id in ids {
                if let Some(row) = state.rows.get_mut(&id) {
                    row.value.clone_from(&entry.value);
                }
            }
        }
        Ok(entries.len())
    }

    async fn update_key(&self, id: EntryId, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let row = state.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        row.key = key.to_string();
        Ok(())
    }

    async fn delete_ids(&self, ids: &[EntryId]) -> Result<usize, StoreError> {
        let mut state = self.state.write();
        Ok(ids.iter().filter(|id| state.rows.remove(*id).is_some()).count())
    }

    async fn delete_where(&self, filter: &ContentFilter) -> Result<usize, StoreError> {
        if filter.is_unscoped() {
            return Err(StoreError::UnscopedDelete);
        }
        let mut state = self.state.write();
        let before = state.rows.len();
        state.rows.retain(|_, row| !filter.matches(row));
        Ok(before - state.rows.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn new_entry(page: &str, section: &str, key: &str, locale: &str, value: &str) -> NewContentEntry {
        NewContentEntry::new(ContentIdentity::new(page, section, key, locale), value)
    }

    #[rstest]
    fn test_upsert_inserts_then_replaces() {
        let store = MemoryStore::new();

        tokio_test::block_on(store.upsert(&[new_entry("HomePage", "cta", "title", "fr", "Titre")]))
            .unwrap();
        tokio_test::block_on(store.upsert(&[new_entry("HomePage", "cta", "title", "fr", "Nouveau")]))
            .unwrap();

        let rows = store.snapshot();
        assert_that!(rows, len(eq(1)));
        assert_that!(rows[0].value, eq("Nouveau"));
    }

    #[rstest]
    fn test_insert_raw_allows_duplicates_in_id_order() {
        let store = MemoryStore::new();
        let ids = store.insert_raw([
            new_entry("HomePage", "cta", "title", "fr", "A"),
            new_entry("HomePage", "cta", "title", "fr", "B"),
        ]);

        assert_eq!(ids, vec![EntryId(1), EntryId(2)]);
        let rows = tokio_test::block_on(store.fetch(&ContentFilter::locale("fr"))).unwrap();
        assert_that!(rows, len(eq(2)));
        assert!(rows[0].id < rows[1].id);
    }

    #[tokio::test]
    async fn test_update_key_and_missing_row() {
        let store = MemoryStore::new();
        let ids = store.insert_raw([new_entry("HomePage", "cta", "cta.title", "fr", "Titre")]);

        store.update_key(ids[0], "title").await.unwrap();
        assert_eq!(store.snapshot()[0].key, "title");

        let missing = store.update_key(EntryId(99), "title").await;
        assert!(matches!(missing, Err(StoreError::NotFound(EntryId(99)))));
    }

    #[tokio::test]
    async fn test_delete_ids_ignores_unknown_ids() {
        let store = MemoryStore::new();
        let ids = store.insert_raw([
            new_entry("HomePage", "cta", "title", "fr", "A"),
            new_entry("HomePage", "cta", "title", "en", "B"),
        ]);

        let removed = store.delete_ids(&[ids[0], EntryId(42)]).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_where_requires_scope() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_entry("Gallery", "images", "img1", "fr", "/a.jpg"),
            new_entry("Gallery", "images", "img2", "fr", "/b.jpg"),
            new_entry("HomePage", "cta", "title", "fr", "Titre"),
        ]);

        let unscoped = store.delete_where(&ContentFilter::all()).await;
        assert!(matches!(unscoped, Err(StoreError::UnscopedDelete)));

        let removed = store.delete_where(&ContentFilter::all().with_page("Gallery")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
    }
}
