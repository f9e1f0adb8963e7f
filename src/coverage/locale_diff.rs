//! Locale-to-locale key diff against the source inventory.

use std::collections::{
    BTreeMap,
    BTreeSet,
};

use serde::Serialize;

use super::known_locales;
use crate::key_path;
use crate::store::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::ContentEntry;

/// Keys one locale lacks or has beyond the reference inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleDiff {
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
}

impl LocaleDiff {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Missing flat paths grouped by namespace (`page` or `page.section`).
    #[must_use]
    pub fn missing_by_namespace(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in &self.missing {
            let Some((page, section, key)) = key_path::split_flat_path(path) else {
                continue;
            };
            let namespace = if key_path::is_general_section(&section) {
                page
            } else {
                format!("{page}{}{section}", key_path::SEPARATOR)
            };
            grouped.entry(namespace).or_default().push(key);
        }
        grouped
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub source_locale: String,
    pub reference_count: usize,
    pub locales: BTreeMap<String, LocaleDiff>,
}

impl CoverageReport {
    /// Missing paths of one locale; empty for unknown locales.
    #[must_use]
    pub fn missing(&self, locale: &str) -> BTreeSet<String> {
        self.locales.get(locale).map(|d| d.missing.clone()).unwrap_or_default()
    }
}

/// Flattened `page.section.key` paths present for `locale`.
fn paths_for(rows: &[ContentEntry], locale: &str) -> BTreeSet<String> {
    rows.iter().filter(|row| row.locale == locale).map(|row| row.identity().flat_path()).collect()
}

/// Diffs every known locale against `source_locale` over a row snapshot.
#[must_use]
pub fn diff_rows(source_locale: &str, locales: &[String], rows: &[ContentEntry]) -> CoverageReport {
    let reference = paths_for(rows, source_locale);

    let locales = known_locales(source_locale, locales, rows)
        .into_iter()
        .filter(|locale| locale != source_locale)
        .map(|locale| {
            let present = paths_for(rows, &locale);
            let diff = LocaleDiff {
                missing: reference.difference(&present).cloned().collect(),
                extra: present.difference(&reference).cloned().collect(),
            };
            (locale, diff)
        })
        .collect();

    CoverageReport {
        source_locale: source_locale.to_string(),
        reference_count: reference.len(),
        locales,
    }
}

/// Reads the store and diffs every known locale against `source_locale`.
///
/// # Errors
/// Returns `StoreError` if the rows cannot be read.
pub async fn diff<S: ContentStore>(
    store: &S,
    source_locale: &str,
    locales: &[String],
) -> Result<CoverageReport, StoreError> {
    let rows = store.fetch(&ContentFilter::all()).await?;
    let report = diff_rows(source_locale, locales, &rows);

    for (locale, locale_diff) in &report.locales {
        tracing::info!(
            locale = %locale,
            missing = locale_diff.missing.len(),
            extra = locale_diff.extra.len(),
            "Locale coverage"
        );
    }
    Ok(report)
}
