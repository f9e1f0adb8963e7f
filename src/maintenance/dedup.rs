//! Duplicate identity removal.

use serde::Serialize;

use super::{
    DuplicateRow,
    MaintenanceOptions,
    delete_in_batches,
};
use crate::store::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::{
    ContentEntry,
    EntryId,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub dry_run: bool,
    pub scanned: usize,
    /// Rows deleted, or rows that would be deleted on a dry run.
    pub removed: usize,
    pub duplicates: Vec<DuplicateRow>,
    pub failed_batches: usize,
}

/// Finds every row whose identity is already held by an earlier row.
///
/// Rows are ordered by `(locale, page, section, key, id)`; within an identity
/// the smallest id is kept.
#[must_use]
pub fn find_duplicates(rows: &[ContentEntry]) -> Vec<DuplicateRow> {
    let mut ordered: Vec<&ContentEntry> = rows.iter().collect();
    ordered.sort_by(|a, b| {
        (&a.locale, &a.page, &a.section, &a.key, a.id)
            .cmp(&(&b.locale, &b.page, &b.section, &b.key, b.id))
    });

    let mut duplicates = Vec::new();
    let mut kept: Option<&ContentEntry> = None;

    for row in ordered {
        match kept {
            Some(first)
                if first.locale == row.locale
                    && first.page == row.page
                    && first.section == row.section
                    && first.key == row.key =>
            {
                duplicates.push(DuplicateRow { kept_id: first.id, removed: row.clone() });
            }
            _ => kept = Some(row),
        }
    }

    duplicates
}

/// Removes duplicate rows, keeping the earliest id per identity.
///
/// # Errors
/// Returns `StoreError` if the snapshot cannot be read. Delete failures are
/// counted in `failed_batches` instead.
pub async fn deduplicate<S: ContentStore>(
    store: &S,
    options: MaintenanceOptions,
) -> Result<DedupReport, StoreError> {
    let rows = store.fetch(&ContentFilter::all()).await?;
    let duplicates = find_duplicates(&rows);

    for duplicate in &duplicates {
        tracing::debug!(
            identity = %duplicate.removed.identity(),
            removed = %duplicate.removed.id,
            kept = %duplicate.kept_id,
            "Duplicate row"
        );
    }

    let mut report = DedupReport {
        dry_run: options.dry_run,
        scanned: rows.len(),
        removed: duplicates.len(),
        duplicates,
        failed_batches: 0,
    };

    if !options.dry_run && !report.duplicates.is_empty() {
        let ids: Vec<EntryId> = report.duplicates.iter().map(|d| d.removed.id).collect();
        let outcome = delete_in_batches(store, &ids, options.batch_size).await;
        report.removed = outcome.deleted;
        report.failed_batches = outcome.failed_batches;
    }

    tracing::info!(
        scanned = report.scanned,
        removed = report.removed,
        failed_batches = report.failed_batches,
        dry_run = report.dry_run,
        "Deduplication finished"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::{
        fixture,
        rstest,
    };

    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::FailingStore;
    use crate::types::{
        ContentIdentity,
        NewContentEntry,
    };

    fn new_row(page: &str, section: &str, key: &str, locale: &str, value: &str) -> NewContentEntry {
        NewContentEntry::new(ContentIdentity::new(page, section, key, locale), value)
    }

    #[fixture]
    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "title", "en", "Title"),
            new_row("HomePage", "cta", "title", "fr", "Titre v2"),
            new_row("HomePage", "general", "title", "fr", "Accueil"),
            new_row("HomePage", "cta", "title", "fr", "Titre v3"),
        ]);
        store
    }

    #[rstest]
    fn test_find_duplicates_keeps_earliest(store: MemoryStore) {
        let duplicates = find_duplicates(&store.snapshot());

        let pairs: Vec<(i64, i64)> =
            duplicates.iter().map(|d| (d.kept_id.0, d.removed.id.0)).collect();
        assert_eq!(pairs, vec![(1, 3), (1, 5)]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_deduplicate_removes_later_rows(store: MemoryStore) {
        let report = deduplicate(&store, MaintenanceOptions::default()).await.unwrap();

        assert_that!(report.scanned, eq(5));
        assert_that!(report.removed, eq(2));
        assert_that!(report.failed_batches, eq(0));
        let values: Vec<String> = store.snapshot().into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec!["Titre", "Title", "Accueil"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_deduplicate_is_idempotent(store: MemoryStore) {
        let options = MaintenanceOptions { batch_size: 1, dry_run: false };

        let first = deduplicate(&store, options).await.unwrap();
        let second = deduplicate(&store, options).await.unwrap();

        assert_eq!(first.removed, 2);
        assert_eq!(second.removed, 0);
        assert!(second.duplicates.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_failed_delete_batch_is_reported(store: MemoryStore) {
        let store = FailingStore::new(store).failing_deletes(&[0]);
        let options = MaintenanceOptions { batch_size: 1, dry_run: false };

        let report = deduplicate(&store, options).await.unwrap();

        assert_that!(report.duplicates, len(eq(2)));
        assert_that!(report.removed, eq(1));
        assert_that!(report.failed_batches, eq(1));
        assert_eq!(store.inner.len(), 4);
    }

    #[rstest]
    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched(store: MemoryStore) {
        let report =
            deduplicate(&store, MaintenanceOptions::default().dry_run(true)).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.removed, 2);
        assert_eq!(store.len(), 5);
    }
}
