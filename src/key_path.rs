//! Key-path model
//!
//! Maps the `(page, section, key)` part of a content identity to and from a
//! position in the nested message tree. The resolver (read path) and the
//! maintenance routines (repair path) both go through this module so the
//! `general` collapse and the canonical key rule cannot drift apart.

use serde::Serialize;

/// Reserved section name whose keys sit directly under the page.
pub const GENERAL_SECTION: &str = "general";

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Returns true if `section` collapses into its page.
#[must_use]
pub fn is_general_section(section: &str) -> bool {
    section == GENERAL_SECTION
}

/// Segments of the tree position for a row.
///
/// `general` rows live at `tree[page][key]`, everything else at
/// `tree[page][section][key]`. The key is kept as a single segment even if
/// it still contains a separator.
#[must_use]
pub fn tree_position<'a>(page: &'a str, section: &'a str, key: &'a str) -> Vec<&'a str> {
    if is_general_section(section) { vec![page, key] } else { vec![page, section, key] }
}

/// Flat dotted path of a row, with the `general` collapse applied.
///
/// # Examples
/// ```
/// use content_i18n_engine::key_path::flat_path;
///
/// assert_eq!(flat_path("HomePage", "general", "title"), "HomePage.title");
/// assert_eq!(flat_path("HomePage", "cta", "title"), "HomePage.cta.title");
/// ```
#[must_use]
pub fn flat_path(page: &str, section: &str, key: &str) -> String {
    tree_position(page, section, key).join(".")
}

/// Inverse of [`tree_position`] for a tree position of depth 2 or 3.
///
/// Returns `(page, section, key)`; a depth-2 position maps back to the
/// `general` section.
#[must_use]
pub fn from_tree_position(segments: &[&str]) -> Option<(String, String, String)> {
    match segments {
        [page, key] => Some(((*page).to_string(), GENERAL_SECTION.to_string(), (*key).to_string())),
        [page, section, key] => {
            Some(((*page).to_string(), (*section).to_string(), (*key).to_string()))
        }
        _ => None,
    }
}

/// Splits a flat path into `(page, section, key)`.
///
/// Two segments map to the `general` section; with three or more, the second
/// segment is the section and the rest is kept as the key.
#[must_use]
pub fn split_flat_path(path: &str) -> Option<(String, String, String)> {
    let mut parts = path.splitn(3, SEPARATOR);
    let page = parts.next().filter(|p| !p.is_empty())?;
    let second = parts.next().filter(|p| !p.is_empty())?;
    match parts.next() {
        None => Some((page.to_string(), GENERAL_SECTION.to_string(), second.to_string())),
        Some(rest) if !rest.is_empty() => {
            Some((page.to_string(), second.to_string(), rest.to_string()))
        }
        Some(_) => None,
    }
}

/// Why a key cannot be repaired automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewReason {
    /// The key still contains a separator after stripping implied segments,
    /// so its leading segment would be read as a different section.
    ResidualSeparator,
    /// The key has empty segments (`a..b`, leading or trailing separator).
    EmptySegment,
}

/// Result of checking a key against the canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonicalization {
    /// Already canonical.
    Clean,
    /// Safe to rewrite to `key`.
    Rewrite { key: String },
    /// Needs an operator; `proposed` is the best-effort canonical key.
    NeedsReview { proposed: String, reason: ReviewReason },
}

/// Computes the canonical form of `key` under `page`/`section`.
///
/// Leading segments already implied by the position are stripped
/// repeatedly: the page name (`HomePage.cta.title`), the section name
/// (`cta.title`) and doubled section names (`cta.cta.title`). A canonical key
/// has no separator left.
///
/// # Examples
/// ```
/// use content_i18n_engine::key_path::{canonicalize, Canonicalization};
///
/// assert_eq!(
///     canonicalize("HomePage", "cta", "cta.title"),
///     Canonicalization::Rewrite { key: "title".to_string() }
/// );
/// assert_eq!(canonicalize("HomePage", "cta", "title"), Canonicalization::Clean);
/// ```
#[must_use]
pub fn canonicalize(page: &str, section: &str, key: &str) -> Canonicalization {
    if !key.contains(SEPARATOR) {
        return Canonicalization::Clean;
    }

    let segments: Vec<&str> = key.split(SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        let proposed =
            segments.iter().copied().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(".");
        return Canonicalization::NeedsReview { proposed, reason: ReviewReason::EmptySegment };
    }

    let mut rest = segments.as_slice();
    while let [first, tail @ ..] = rest {
        if tail.is_empty() {
            break;
        }
        let implied = *first == page || *first == section;
        if !implied {
            break;
        }
        rest = tail;
    }

    let proposed = rest.join(".");
    if rest.len() > 1 {
        Canonicalization::NeedsReview { proposed, reason: ReviewReason::ResidualSeparator }
    } else {
        Canonicalization::Rewrite { key: proposed }
    }
}

/// Returns true if `key` violates the canonical form.
#[must_use]
pub fn is_dirty(page: &str, section: &str, key: &str) -> bool {
    canonicalize(page, section, key) != Canonicalization::Clean
}

/// Normalizes a template namespace into `(page, section)`.
///
/// `HomePage.cta` becomes `("HomePage", "cta")`, a bare `HomePage` becomes
/// `("HomePage", "general")`.
#[must_use]
pub fn split_namespace(namespace: &str) -> (String, String) {
    namespace.split_once(SEPARATOR).map_or_else(
        || (namespace.to_string(), GENERAL_SECTION.to_string()),
        |(page, section)| (page.to_string(), section.to_string()),
    )
}
