//! Content store collaborator.
//!
//! The engine sees the relational table of content rows as a key-value
//! store: bulk reads by filter, upsert keyed on the composite identity,
//! id-scoped deletes and a predicate delete reserved for full resets.

/// In-memory store
mod memory;
/// SQLite-backed store
mod sqlite;

use std::future::Future;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{
    ContentEntry,
    EntryId,
    NewContentEntry,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Row {0} not found")]
    NotFound(EntryId),

    #[error("Refusing to run an unscoped predicate delete")]
    UnscopedDelete,
}

/// Row filter for reads and predicate deletes.
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentFilter {
    pub locale: Option<String>,
    pub page: Option<String>,
    pub section: Option<String>,
    pub key: Option<String>,
}

impl ContentFilter {
    /// Matches every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn locale(locale: impl Into<String>) -> Self {
        Self { locale: Some(locale.into()), ..Self::default() }
    }

    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Returns true if no field is constrained.
    #[must_use]
    pub const fn is_unscoped(&self) -> bool {
        self.locale.is_none() && self.page.is_none() && self.section.is_none() && self.key.is_none()
    }

    #[must_use]
    pub fn matches(&self, entry: &ContentEntry) -> bool {
        fn field_matches(expected: Option<&String>, actual: &str) -> bool {
            expected.is_none_or(|e| e == actual)
        }

        field_matches(self.locale.as_ref(), &entry.locale)
            && field_matches(self.page.as_ref(), &entry.page)
            && field_matches(self.section.as_ref(), &entry.section)
            && field_matches(self.key.as_ref(), &entry.key)
    }
}

/// Persistence seam for content rows.
///
/// Rows are returned in ascending id order. Mutation only happens through
/// identity-keyed upsert or explicit id lists; `delete_where` is kept for
/// full resets and rejects an unscoped filter.
pub trait ContentStore: Send + Sync {
    /// Reads all rows matching `filter`.
    fn fetch(
        &self,
        filter: &ContentFilter,
    ) -> impl Future<Output = Result<Vec<ContentEntry>, StoreError>> + Send;

    /// Replaces the value of rows at each identity, inserting where none exists.
    ///
    /// Returns the number of entries written.
    fn upsert(
        &self,
        entries: &[NewContentEntry],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Renames the key of one row in place.
    fn update_key(
        &self,
        id: EntryId,
        key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes rows by id. Returns the number of rows removed.
    fn delete_ids(&self, ids: &[EntryId]) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Deletes every row matching `filter`.
    fn delete_where(
        &self,
        filter: &ContentFilter,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn entry(locale: &str, page: &str, section: &str, key: &str) -> ContentEntry {
        ContentEntry {
            id: EntryId(1),
            page: page.to_string(),
            section: section.to_string(),
            key: key.to_string(),
            locale: locale.to_string(),
            value: String::new(),
        }
    }

    #[rstest]
    #[case::all(ContentFilter::all(), true)]
    #[case::locale(ContentFilter::locale("fr"), true)]
    #[case::other_locale(ContentFilter::locale("en"), false)]
    #[case::page(ContentFilter::locale("fr").with_page("HomePage"), true)]
    #[case::section(ContentFilter::all().with_section("cta"), true)]
    #[case::other_section(ContentFilter::all().with_section("hero"), false)]
    #[case::key(ContentFilter::all().with_page("HomePage").with_key("title"), true)]
    fn test_filter_matches(#[case] filter: ContentFilter, #[case] expected: bool) {
        let row = entry("fr", "HomePage", "cta", "title");
        assert_eq!(filter.matches(&row), expected);
    }

    #[rstest]
    fn test_filter_is_unscoped() {
        assert!(ContentFilter::all().is_unscoped());
        assert!(!ContentFilter::all().with_page("Gallery").is_unscoped());
    }
}
