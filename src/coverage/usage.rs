//! Coverage of keys referenced by templates.

use std::collections::{
    BTreeMap,
    BTreeSet,
    HashSet,
};

use serde::Serialize;

use super::known_locales;
use crate::indexer::UsageIndex;
use crate::ir::key_usage::KeyUsageReference;
use crate::key_path;
use crate::store::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::ContentEntry;

/// A referenced key with no row in some locale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingUsage {
    pub key: String,
    /// Templates referencing the key.
    pub files: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCoverage {
    pub source_locale: String,
    pub usages: usize,
    /// locale → namespace → keys used by templates but absent from the store.
    pub missing: BTreeMap<String, BTreeMap<String, Vec<MissingUsage>>>,
    /// Source-locale paths no template references.
    pub unused: BTreeSet<String>,
    /// Usages whose page cannot be determined (no namespace, undotted key).
    pub unattributed: Vec<KeyUsageReference>,
}

impl UsageCoverage {
    /// Keys used but missing in the source locale.
    #[must_use]
    pub fn used_but_missing(&self) -> Option<&BTreeMap<String, Vec<MissingUsage>>> {
        self.missing.get(&self.source_locale)
    }
}

type Position = (String, String, String);

/// Stored `(page, section, key)` positions per locale.
fn positions_by_locale(rows: &[ContentEntry]) -> BTreeMap<&str, HashSet<Position>> {
    let mut positions: BTreeMap<&str, HashSet<Position>> = BTreeMap::new();
    for row in rows {
        positions
            .entry(row.locale.as_str())
            .or_default()
            .insert((row.page.clone(), row.section.clone(), row.key.clone()));
    }
    positions
}

/// Label used to group a usage in reports.
fn namespace_label(usage: &KeyUsageReference) -> Option<String> {
    usage.namespace.clone().or_else(|| {
        usage.page_section().map(|(page, section)| {
            if key_path::is_general_section(&section) {
                page
            } else {
                format!("{page}{}{section}", key_path::SEPARATOR)
            }
        })
    })
}

/// Diffs template usages against the rows of every known locale.
#[must_use]
pub fn usage_diff_rows(
    index: &UsageIndex,
    rows: &[ContentEntry],
    source_locale: &str,
    locales: &[String],
) -> UsageCoverage {
    let positions = positions_by_locale(rows);
    let all_locales = known_locales(source_locale, locales, rows);
    let empty = HashSet::new();

    let mut coverage = UsageCoverage {
        source_locale: source_locale.to_string(),
        usages: index.usages.len(),
        ..UsageCoverage::default()
    };
    let mut referenced: HashSet<Position> = HashSet::new();

    for usage in &index.usages {
        let candidates = usage.candidate_positions();
        let Some(namespace) = namespace_label(usage).filter(|_| !candidates.is_empty()) else {
            coverage.unattributed.push(usage.clone());
            continue;
        };
        referenced.extend(candidates.iter().cloned());

        for locale in &all_locales {
            let stored = positions.get(locale.as_str()).unwrap_or(&empty);
            if candidates.iter().any(|candidate| stored.contains(candidate)) {
                continue;
            }

            let keys = coverage
                .missing
                .entry(locale.clone())
                .or_default()
                .entry(namespace.clone())
                .or_default();
            if let Some(existing) = keys.iter_mut().find(|m| m.key == usage.key) {
                existing.files.insert(usage.file.clone());
            } else {
                keys.push(MissingUsage {
                    key: usage.key.clone(),
                    files: BTreeSet::from([usage.file.clone()]),
                });
            }
        }
    }

    for keys in coverage.missing.values_mut().flat_map(BTreeMap::values_mut) {
        keys.sort();
    }

    coverage.unused = rows
        .iter()
        .filter(|row| row.locale == source_locale)
        .filter(|row| !referenced.contains(&(row.page.clone(), row.section.clone(), row.key.clone())))
        .map(|row| row.identity().flat_path())
        .collect();

    coverage
}

/// Reads the store and diffs template usages against it.
///
/// # Errors
/// Returns `StoreError` if the rows cannot be read.
pub async fn usage_diff<S: ContentStore>(
    store: &S,
    index: &UsageIndex,
    source_locale: &str,
    locales: &[String],
) -> Result<UsageCoverage, StoreError> {
    let rows = store.fetch(&ContentFilter::all()).await?;
    let coverage = usage_diff_rows(index, &rows, source_locale, locales);

    for usage in &coverage.unattributed {
        tracing::warn!(file = %usage.file, key = %usage.key, "Cannot attribute key usage to a page");
    }
    tracing::info!(
        usages = coverage.usages,
        missing_in_source = coverage.used_but_missing().map_or(0, BTreeMap::len),
        unused = coverage.unused.len(),
        "Usage coverage"
    );
    Ok(coverage)
}
