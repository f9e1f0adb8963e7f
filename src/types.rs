//! Core types used throughout the project.

use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// Row id assigned by the content store.
///
/// Ids grow monotonically, so the smaller id is always the older row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The composite identity `(page, section, key, locale)` of a content row.
///
/// At most one row per identity is allowed to survive maintenance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentIdentity {
    pub page: String,
    pub section: String,
    pub key: String,
    pub locale: String,
}

impl ContentIdentity {
    #[must_use]
    pub fn new(
        page: impl Into<String>,
        section: impl Into<String>,
        key: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            page: page.into(),
            section: section.into(),
            key: key.into(),
            locale: locale.into(),
        }
    }

    /// Same page/section/key under another locale.
    #[must_use]
    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self { locale: locale.into(), ..self.clone() }
    }

    /// Same page/section/locale under another key.
    #[must_use]
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self { key: key.into(), ..self.clone() }
    }

    /// Flat `page.section.key` path with the `general` collapse applied.
    #[must_use]
    pub fn flat_path(&self) -> String {
        crate::key_path::flat_path(&self.page, &self.section, &self.key)
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}@{}", self.page, self.section, self.key, self.locale)
    }
}

/// A persisted row of translatable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: EntryId,
    pub page: String,
    pub section: String,
    pub key: String,
    pub locale: String,
    pub value: String,
}

impl ContentEntry {
    #[must_use]
    pub fn identity(&self) -> ContentIdentity {
        ContentIdentity::new(&self.page, &self.section, &self.key, &self.locale)
    }

    /// Returns true if this row sits at `identity`.
    #[must_use]
    pub fn has_identity(&self, identity: &ContentIdentity) -> bool {
        self.page == identity.page
            && self.section == identity.section
            && self.key == identity.key
            && self.locale == identity.locale
    }
}

/// A row to be written through upsert; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContentEntry {
    pub page: String,
    pub section: String,
    pub key: String,
    pub locale: String,
    pub value: String,
}

impl NewContentEntry {
    #[must_use]
    pub fn new(identity: ContentIdentity, value: impl Into<String>) -> Self {
        let ContentIdentity { page, section, key, locale } = identity;
        Self { page, section, key, locale, value: value.into() }
    }

    #[must_use]
    pub fn identity(&self) -> ContentIdentity {
        ContentIdentity::new(&self.page, &self.section, &self.key, &self.locale)
    }
}

/// A position in source code (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub character: u32,
}

impl From<tree_sitter::Point> for SourcePosition {
    #[allow(clippy::cast_possible_truncation)]
    fn from(point: tree_sitter::Point) -> Self {
        Self { line: point.row as u32, character: point.column as u32 }
    }
}

/// A range in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    #[must_use]
    pub fn from_node(node: &tree_sitter::Node<'_>) -> Self {
        Self { start: node.start_position().into(), end: node.end_position().into() }
    }
}
