//! Defensive parsing of translation responses.
//!
//! Order of attempts: strip code fences and parse the whole reply, then the
//! first balanced `{...}` span that parses, then the widest brace span, then
//! any complete `"locale": "text"` pairs of a truncated reply. If all of that
//! fails, every target locale gets [`TRANSLATION_ERROR_PLACEHOLDER`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Value reported for a locale whose translation could not be recovered.
pub const TRANSLATION_ERROR_PLACEHOLDER: &str = "[translation error]";

static BRACE_SPAN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

static STRING_PAIR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#""([A-Za-z]{2,3}(?:[-_][A-Za-z0-9]+)?)"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok()
});

/// Result of parsing one response, keyed by target locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "translations", rename_all = "camelCase")]
pub enum ParseOutcome {
    /// The reply was the JSON object, possibly fenced.
    Parsed(BTreeMap<String, String>),
    /// The object was extracted from surrounding prose or a truncated reply.
    Recovered(BTreeMap<String, String>),
    /// Nothing usable; every target holds the placeholder.
    Failed(BTreeMap<String, String>),
}

impl ParseOutcome {
    /// Placeholder outcome for `targets`.
    #[must_use]
    pub fn failed(targets: &[String]) -> Self {
        Self::Failed(
            targets
                .iter()
                .map(|locale| (locale.clone(), TRANSLATION_ERROR_PLACEHOLDER.to_string()))
                .collect(),
        )
    }

    /// Translations usable for upsert; `None` for a failed outcome.
    #[must_use]
    pub const fn translations(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Parsed(map) | Self::Recovered(map) => Some(map),
            Self::Failed(_) => None,
        }
    }

    /// Every value, placeholders included.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Parsed(map) | Self::Recovered(map) | Self::Failed(map) => map,
        }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Parsed(_) => "parsed",
            Self::Recovered(_) => "recovered",
            Self::Failed(_) => "failed",
        }
    }
}

/// Removes a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Keeps non-empty string values for requested locales.
fn select_targets(object: &serde_json::Map<String, Value>, targets: &[String]) -> BTreeMap<String, String> {
    targets
        .iter()
        .filter_map(|locale| match object.get(locale) {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                Some((locale.clone(), text.clone()))
            }
            _ => None,
        })
        .collect()
}

fn parse_object(candidate: &str, targets: &[String]) -> Option<BTreeMap<String, String>> {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(candidate) else {
        return None;
    };
    let selected = select_targets(&object, targets);
    (!selected.is_empty()).then_some(selected)
}

/// The `{...}` span opening at byte `start` whose braces balance, ignoring
/// braces inside strings.
fn balanced_span_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.get(start..)?.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return text.get(start..=start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Complete `"locale": "text"` pairs, for replies cut off mid-object.
fn salvage_pairs(text: &str, targets: &[String]) -> Option<BTreeMap<String, String>> {
    let pattern = STRING_PAIR.as_ref()?;
    let salvaged: BTreeMap<String, String> = pattern
        .captures_iter(text)
        .filter_map(|captures| {
            let locale = captures.get(1)?.as_str();
            if !targets.iter().any(|t| t == locale) {
                return None;
            }
            let value: String =
                serde_json::from_str(&format!("\"{}\"", captures.get(2)?.as_str())).ok()?;
            (!value.trim().is_empty()).then(|| (locale.to_string(), value))
        })
        .collect();
    (!salvaged.is_empty()).then_some(salvaged)
}

/// Parses a raw reply into translations for `targets`.
#[must_use]
pub fn parse_translation_response(raw: &str, targets: &[String]) -> ParseOutcome {
    let stripped = strip_code_fence(raw);
    if let Some(map) = parse_object(stripped, targets) {
        return ParseOutcome::Parsed(map);
    }

    let recovered = raw
        .match_indices('{')
        .find_map(|(start, _)| parse_object(balanced_span_at(raw, start)?, targets))
        .or_else(|| {
            let span = BRACE_SPAN.as_ref()?.find(raw)?;
            parse_object(span.as_str(), targets)
        })
        .or_else(|| salvage_pairs(raw, targets));

    match recovered {
        Some(map) => ParseOutcome::Recovered(map),
        None => ParseOutcome::failed(targets),
    }
}
