//! Indexer type definitions.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::config::MatcherError;
use crate::ir::key_usage::KeyUsageReference;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Workspace root does not exist: {0}")]
    InvalidRoot(String),

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// Key usages found in a workspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageIndex {
    pub files_scanned: usize,
    pub usages: Vec<KeyUsageReference>,
}

impl UsageIndex {
    /// Usages grouped by their full dotted path.
    #[must_use]
    pub fn by_path(&self) -> BTreeMap<String, Vec<&KeyUsageReference>> {
        let mut grouped: BTreeMap<String, Vec<&KeyUsageReference>> = BTreeMap::new();
        for usage in &self.usages {
            grouped.entry(usage.full_path()).or_default().push(usage);
        }
        grouped
    }
}
