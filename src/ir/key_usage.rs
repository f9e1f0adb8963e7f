//! Key usage references extracted from templates.

use serde::Serialize;

use crate::key_path::{
    self,
    GENERAL_SECTION,
    SEPARATOR,
};
use crate::types::SourceRange;

/// A `(namespace, key)` pair referenced by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUsageReference {
    /// Namespace of the translator binding, e.g. `HomePage` or `HomePage.cta`.
    pub namespace: Option<String>,
    pub key: String,
    /// Template path relative to the workspace root.
    pub file: String,
    pub range: SourceRange,
}

impl KeyUsageReference {
    /// Full dotted path as the rendering layer looks it up.
    #[must_use]
    pub fn full_path(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}{SEPARATOR}{}", self.key),
            None => self.key.clone(),
        }
    }

    /// `(page, section)` this usage belongs to, used to group reports.
    ///
    /// A usage without namespace takes its page from the first key segment.
    #[must_use]
    pub fn page_section(&self) -> Option<(String, String)> {
        match &self.namespace {
            Some(namespace) => Some(key_path::split_namespace(namespace)),
            None => key_path::split_flat_path(&self.key).map(|(page, section, _)| (page, section)),
        }
    }

    /// Every `(page, section, key)` position a row for this usage may be stored at.
    ///
    /// Authors are inconsistent about nesting, so `t("title")` under
    /// `useTranslations("HomePage.cta")` may live at `(HomePage, cta, title)`
    /// or at `(HomePage, general, title)`, and `t("cta.title")` under
    /// `useTranslations("HomePage")` at `(HomePage, cta, title)`.
    #[must_use]
    pub fn candidate_positions(&self) -> Vec<(String, String, String)> {
        let mut candidates = Vec::new();

        match &self.namespace {
            Some(namespace) => {
                let (page, section) = key_path::split_namespace(namespace);
                if key_path::is_general_section(&section)
                    && let Some((first, rest)) = self.key.split_once(SEPARATOR)
                {
                    candidates.push((page.clone(), first.to_string(), rest.to_string()));
                }
                candidates.push((page.clone(), section.clone(), self.key.clone()));
                if !key_path::is_general_section(&section) {
                    candidates.push((page, GENERAL_SECTION.to_string(), self.key.clone()));
                }
            }
            None => {
                if let Some(position) = key_path::split_flat_path(&self.key) {
                    candidates.push(position);
                }
            }
        }

        candidates.dedup();
        candidates
    }
}
