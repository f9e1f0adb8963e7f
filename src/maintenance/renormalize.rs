//! Key renormalization.
//!
//! Dirty keys are rewritten to their canonical form. A row whose canonical
//! identity is already taken, either by an existing row or by a rename made
//! earlier in the same pass, is deleted instead of renamed.

use std::collections::HashMap;

use serde::Serialize;

use super::{
    DuplicateRow,
    MaintenanceOptions,
    delete_in_batches,
};
use crate::key_path::{
    Canonicalization,
    ReviewReason,
    canonicalize,
};
use crate::store::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::{
    ContentEntry,
    ContentIdentity,
    EntryId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamedRow {
    pub id: EntryId,
    pub from: ContentIdentity,
    pub key: String,
}

/// A dirty key that is reported but never repaired automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRow {
    pub entry: ContentEntry,
    pub proposed: String,
    pub reason: ReviewReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenormalizeReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub updated: usize,
    pub deleted_as_duplicate: usize,
    pub renamed: Vec<RenamedRow>,
    pub duplicates: Vec<DuplicateRow>,
    pub needs_review: Vec<ReviewRow>,
    /// Renames rejected by the store.
    pub failed: usize,
    pub failed_batches: usize,
}

/// First row id per identity, updated as renames are applied.
#[derive(Debug, Default)]
struct Occupancy {
    holders: HashMap<ContentIdentity, EntryId>,
}

impl Occupancy {
    fn from_rows(rows: &[ContentEntry]) -> Self {
        let mut holders = HashMap::new();
        for row in rows {
            holders.entry(row.identity()).or_insert(row.id);
        }
        Self { holders }
    }

    fn holder(&self, identity: &ContentIdentity) -> Option<EntryId> {
        self.holders.get(identity).copied()
    }

    fn rename(&mut self, id: EntryId, from: &ContentIdentity, to: ContentIdentity) {
        if self.holders.get(from) == Some(&id) {
            self.holders.remove(from);
        }
        self.holders.insert(to, id);
    }
}

/// Rewrites dirty keys without creating duplicate identities.
///
/// Rows are processed in id order. On a dry run no rename or delete is
/// issued and the counts describe what a real pass would do.
///
/// # Errors
/// Returns `StoreError` if the snapshot cannot be read. Failed renames and
/// delete batches are counted in the report.
pub async fn renormalize<S: ContentStore>(
    store: &S,
    options: MaintenanceOptions,
) -> Result<RenormalizeReport, StoreError> {
    let rows = store.fetch(&ContentFilter::all()).await?;
    let mut occupancy = Occupancy::from_rows(&rows);
    let mut report = RenormalizeReport {
        dry_run: options.dry_run,
        scanned: rows.len(),
        ..RenormalizeReport::default()
    };

    for row in rows {
        let key = match canonicalize(&row.page, &row.section, &row.key) {
            Canonicalization::Clean => continue,
            Canonicalization::NeedsReview { proposed, reason } => {
                tracing::warn!(
                    identity = %row.identity(),
                    proposed = %proposed,
                    ?reason,
                    "Key needs manual review"
                );
                report.needs_review.push(ReviewRow { entry: row, proposed, reason });
                continue;
            }
            Canonicalization::Rewrite { key } => key,
        };

        let from = row.identity();
        let target = from.with_key(&key);

        if let Some(kept_id) = occupancy.holder(&target) {
            tracing::debug!(identity = %from, kept = %kept_id, "Dirty key duplicates a canonical row");
            report.duplicates.push(DuplicateRow { kept_id, removed: row });
            continue;
        }

        if !options.dry_run
            && let Err(error) = store.update_key(row.id, &key).await
        {
            tracing::error!(id = %row.id, identity = %from, %error, "Failed to rename key");
            report.failed += 1;
            continue;
        }

        tracing::debug!(id = %row.id, from = %from, key = %key, "Renamed key");
        occupancy.rename(row.id, &from, target);
        report.renamed.push(RenamedRow { id: row.id, from, key });
    }

    report.updated = report.renamed.len();
    report.deleted_as_duplicate = report.duplicates.len();

    if !options.dry_run && !report.duplicates.is_empty() {
        let ids: Vec<EntryId> = report.duplicates.iter().map(|d| d.removed.id).collect();
        let outcome = delete_in_batches(store, &ids, options.batch_size).await;
        report.deleted_as_duplicate = outcome.deleted;
        report.failed_batches = outcome.failed_batches;
    }

    tracing::info!(
        scanned = report.scanned,
        updated = report.updated,
        deleted_as_duplicate = report.deleted_as_duplicate,
        needs_review = report.needs_review.len(),
        failed = report.failed,
        dry_run = report.dry_run,
        "Renormalization finished"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::maintenance::find_duplicates;
    use crate::store::MemoryStore;
    use crate::types::NewContentEntry;

    fn new_row(page: &str, section: &str, key: &str, locale: &str, value: &str) -> NewContentEntry {
        NewContentEntry::new(ContentIdentity::new(page, section, key, locale), value)
    }

    fn keys(store: &MemoryStore) -> Vec<(i64, String)> {
        store.snapshot().into_iter().map(|e| (e.id.0, e.key)).collect()
    }

    #[tokio::test]
    async fn test_free_target_is_renamed_in_place() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "cta.title", "fr", "Titre"),
            new_row("HomePage", "cta", "HomePage.cta.button", "fr", "Réserver"),
        ]);

        let report = renormalize(&store, MaintenanceOptions::default()).await.unwrap();

        assert_that!(report.updated, eq(2));
        assert_that!(report.deleted_as_duplicate, eq(0));
        assert_eq!(keys(&store), vec![(1, "title".to_string()), (2, "button".to_string())]);
    }

    #[tokio::test]
    async fn test_general_prefix_is_stripped() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "general", "general.title", "fr", "Bienvenue"),
            new_row("HomePage", "general", "cta.title", "fr", "Titre"),
        ]);

        let report = renormalize(&store, MaintenanceOptions::default()).await.unwrap();

        assert_that!(report.updated, eq(1));
        assert_that!(report.needs_review, len(eq(1)));
        assert_eq!(keys(&store), vec![(1, "title".to_string()), (2, "cta.title".to_string())]);
    }

    #[tokio::test]
    async fn test_occupied_target_deletes_dirty_row() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "cta.title", "fr", "Titre (ancien)"),
        ]);

        let report = renormalize(&store, MaintenanceOptions::default()).await.unwrap();

        assert_that!(report.updated, eq(0));
        assert_that!(report.deleted_as_duplicate, eq(1));
        assert_that!(report.duplicates[0].kept_id, eq(EntryId(1)));
        assert_eq!(store.snapshot()[0].value, "Titre");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_two_dirty_rows_onto_same_target() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "cta.title", "fr", "first"),
            new_row("HomePage", "cta", "cta.cta.title", "fr", "second"),
        ]);

        let report = renormalize(&store, MaintenanceOptions::default()).await.unwrap();

        assert_that!(report.updated, eq(1));
        assert_that!(report.deleted_as_duplicate, eq(1));
        assert_eq!(keys(&store), vec![(1, "title".to_string())]);
        assert!(find_duplicates(&store.snapshot()).is_empty());
    }

    #[tokio::test]
    async fn test_locales_do_not_collide() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "cta.title", "en", "Title"),
        ]);

        let report = renormalize(&store, MaintenanceOptions::default()).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(store.len(), 2);
    }

    #[rstest]
    #[case::residual("HomePage", "cta", "hero.title", ReviewReason::ResidualSeparator)]
    #[case::empty_segment("HomePage", "cta", "cta..title", ReviewReason::EmptySegment)]
    #[tokio::test]
    async fn test_ambiguous_keys_need_review(
        #[case] page: &str,
        #[case] section: &str,
        #[case] key: &str,
        #[case] reason: ReviewReason,
    ) {
        let store = MemoryStore::new();
        store.insert_raw([new_row(page, section, key, "fr", "v")]);

        let report = renormalize(&store, MaintenanceOptions::default()).await.unwrap();

        assert_that!(report.needs_review, len(eq(1)));
        assert_eq!(report.needs_review[0].reason, reason);
        assert_eq!(store.snapshot()[0].key, key);
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_writing() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "cta.title", "fr", "dup"),
            new_row("HomePage", "cta", "cta.button", "fr", "Réserver"),
        ]);

        let report =
            renormalize(&store, MaintenanceOptions::default().dry_run(true)).await.unwrap();

        assert_eq!((report.updated, report.deleted_as_duplicate), (1, 1));
        assert_eq!(keys(&store)[1].1, "cta.title");
        assert_eq!(keys(&store)[2].1, "cta.button");
        assert_eq!(store.len(), 3);
    }
}
