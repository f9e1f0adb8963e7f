//! Nested JSON message files (`messages/<locale>.json`).
//!
//! Import maps depth-2 leaves to the `general` section and depth-3 leaves to
//! `(page, section, key)`. Export writes a resolved tree back in the same shape.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::key_path;
use crate::resolver::ResolvedTree;
use crate::store::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::{
    ContentIdentity,
    NewContentEntry,
};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to parse messages file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Messages file must contain a JSON object at the top level")]
    NotAnObject,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rows parsed from a messages file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessages {
    pub entries: Vec<NewContentEntry>,
    /// Dotted paths with no row representation: unsupported depth, dirty
    /// key or a non-string value.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub locale: String,
    pub imported: usize,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceReport {
    pub deleted: usize,
    pub inserted: usize,
}

/// Collects every leaf with its path; only strings carry a value.
fn flatten_json_value(
    json: &Value,
    prefix: &mut Vec<String>,
    result: &mut Vec<(Vec<String>, Option<String>)>,
) {
    match json {
        Value::Object(map) => {
            for (key, value) in map {
                prefix.push(key.clone());
                flatten_json_value(value, prefix, result);
                prefix.pop();
            }
        }
        Value::String(s) => result.push((prefix.clone(), Some(s.clone()))),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => {
            result.push((prefix.clone(), None));
        }
    }
}

/// Converts a nested messages object into content rows for `locale`.
///
/// # Errors
/// Returns `ImportError::NotAnObject` if `json` is not an object.
pub fn parse_messages(locale: &str, json: &Value) -> Result<ParsedMessages, ImportError> {
    if !json.is_object() {
        return Err(ImportError::NotAnObject);
    }

    let mut leaves = Vec::new();
    flatten_json_value(json, &mut Vec::new(), &mut leaves);

    let mut parsed = ParsedMessages::default();
    for (segments, value) in leaves {
        let segment_refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let position = key_path::from_tree_position(&segment_refs)
            .filter(|(page, section, key)| !key_path::is_dirty(page, section, key));

        match position.zip(value) {
            Some(((page, section, key), value)) => parsed
                .entries
                .push(NewContentEntry::new(ContentIdentity::new(page, section, key, locale), value)),
            None => parsed.skipped.push(segments.join(".")),
        }
    }

    Ok(parsed)
}

/// Imports a messages file body into the store.
///
/// # Errors
/// Returns `ImportError` if the body is not a JSON object or the upsert fails.
pub async fn import_messages<S: ContentStore>(
    store: &S,
    locale: &str,
    json_text: &str,
) -> Result<ImportReport, ImportError> {
    let json: Value = serde_json::from_str(json_text)?;
    let parsed = parse_messages(locale, &json)?;

    for path in &parsed.skipped {
        tracing::warn!(locale = %locale, path = %path, "Skipping message with no row representation");
    }

    let imported = store.upsert(&parsed.entries).await?;
    tracing::info!(locale = %locale, imported, skipped = parsed.skipped.len(), "Messages imported");

    Ok(ImportReport { locale: locale.to_string(), imported, skipped: parsed.skipped })
}

/// Renders a resolved tree as a pretty-printed messages file.
///
/// # Errors
/// Returns `serde_json::Error` if serialization fails.
pub fn export_messages(tree: &ResolvedTree) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&tree.to_json())
}

/// Replaces every row of one `(page, section, locale)` with `entries`.
///
/// This is the predicate-delete bulk reset, e.g. rewriting all gallery
/// entries. It is not atomic: a failed upsert leaves the section empty.
///
/// # Errors
/// Returns `StoreError` if the delete or the upsert fails.
pub async fn replace_section<S: ContentStore>(
    store: &S,
    page: &str,
    section: &str,
    locale: &str,
    entries: &[(String, String)],
) -> Result<ReplaceReport, StoreError> {
    let filter = ContentFilter::locale(locale).with_page(page).with_section(section);
    let deleted = store.delete_where(&filter).await?;

    let rows: Vec<NewContentEntry> = entries
        .iter()
        .map(|(key, value)| {
            NewContentEntry::new(ContentIdentity::new(page, section, key, locale), value.clone())
        })
        .collect();
    let inserted = store.upsert(&rows).await?;

    tracing::info!(page = %page, section = %section, locale = %locale, deleted, inserted, "Section replaced");
    Ok(ReplaceReport { deleted, inserted })
}
