//! Consistency maintenance passes over the content store.
//!
//! Passes run as discrete batch jobs over a snapshot taken at the start of
//! the pass. Deletes always go through explicit id lists in bounded batches;
//! a failed batch is logged and counted, and the remaining batches still run.

pub mod dedup;
pub mod renormalize;

use serde::Serialize;

pub use dedup::{
    DedupReport,
    deduplicate,
    find_duplicates,
};
pub use renormalize::{
    RenormalizeReport,
    renormalize,
};

use crate::config::MaintenanceConfig;
use crate::store::ContentStore;
use crate::types::{
    ContentEntry,
    EntryId,
};

/// Options shared by maintenance passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceOptions {
    /// Rows per delete call.
    pub batch_size: usize,
    /// Report what would change without touching the store.
    pub dry_run: bool,
}

impl Default for MaintenanceOptions {
    fn default() -> Self {
        Self::from(&MaintenanceConfig::default())
    }
}

impl From<&MaintenanceConfig> for MaintenanceOptions {
    fn from(config: &MaintenanceConfig) -> Self {
        Self { batch_size: config.delete_batch_size, dry_run: false }
    }
}

impl MaintenanceOptions {
    #[must_use]
    pub const fn dry_run(self, dry_run: bool) -> Self {
        Self { dry_run, ..self }
    }
}

/// A row removed because another row already holds its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRow {
    /// Row that survives at the identity.
    pub kept_id: EntryId,
    pub removed: ContentEntry,
}

/// Outcome of a batched id deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchDeletion {
    pub deleted: usize,
    pub failed_batches: usize,
}

/// Deletes `ids` in chunks of `batch_size`, continuing past failed chunks.
pub async fn delete_in_batches<S: ContentStore>(
    store: &S,
    ids: &[EntryId],
    batch_size: usize,
) -> BatchDeletion {
    let mut outcome = BatchDeletion::default();

    for (index, batch) in ids.chunks(batch_size.max(1)).enumerate() {
        match store.delete_ids(batch).await {
            Ok(deleted) => {
                tracing::debug!(batch = index, deleted, "Deleted batch");
                outcome.deleted += deleted;
            }
            Err(error) => {
                tracing::error!(batch = index, size = batch.len(), %error, "Failed to delete batch");
                outcome.failed_batches += 1;
            }
        }
    }

    outcome
}
