//! Coverage analysis: which keys each locale is missing.
//!
//! Two reference inventories are supported: the rows of the source locale
//! ([`locale_diff`]) and the keys referenced by templates ([`usage`]).

pub mod locale_diff;
pub mod usage;

use std::collections::BTreeSet;

pub use locale_diff::{
    CoverageReport,
    LocaleDiff,
    diff,
    diff_rows,
};
pub use usage::{
    UsageCoverage,
    usage_diff,
    usage_diff_rows,
};

use crate::types::ContentEntry;

/// Source locale first, then configured locales, then any other locale
/// present in `rows`, without repeats.
fn known_locales(source_locale: &str, configured: &[String], rows: &[ContentEntry]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut locales = Vec::new();

    let present: BTreeSet<&str> = rows.iter().map(|row| row.locale.as_str()).collect();
    for locale in std::iter::once(source_locale)
        .chain(configured.iter().map(String::as_str))
        .chain(present)
    {
        if seen.insert(locale) {
            locales.push(locale.to_string());
        }
    }

    locales
}
