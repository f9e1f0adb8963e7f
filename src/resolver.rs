//! Tree resolver
//!
//! Rebuilds the nested `page → section → key` message tree for one locale
//! from the flat content rows. The tree is derived on every read and never
//! cached or written back.

use std::collections::{
    BTreeMap,
    HashSet,
};

use serde::Serialize;
use serde_json::{
    Map,
    Value,
};

use crate::key_path;
use crate::store::{
    ContentFilter,
    ContentStore,
};
use crate::types::{
    ContentEntry,
    ContentIdentity,
};

/// A node of the resolved tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Leaf(String),
    Branch(BTreeMap<String, TreeNode>),
}

impl TreeNode {
    fn to_json(&self) -> Value {
        match self {
            Self::Leaf(value) => Value::String(value.clone()),
            Self::Branch(children) => Value::Object(
                children.iter().map(|(k, v)| (k.clone(), v.to_json())).collect::<Map<_, _>>(),
            ),
        }
    }
}

/// Locale-scoped nested message tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTree {
    locale: String,
    pages: BTreeMap<String, TreeNode>,
    shadowed: Vec<ContentIdentity>,
}

impl ResolvedTree {
    /// An empty tree: "no translations available" for `locale`.
    #[must_use]
    pub fn empty(locale: impl Into<String>) -> Self {
        Self { locale: locale.into(), ..Self::default() }
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Rows that could not be placed because a section of the same name
    /// occupies their position.
    #[must_use]
    pub fn shadowed(&self) -> &[ContentIdentity] {
        &self.shadowed
    }

    /// Looks up a leaf by tree segments.
    #[must_use]
    pub fn get_segments(&self, segments: &[&str]) -> Option<&str> {
        let (first, rest) = segments.split_first()?;
        let mut node = self.pages.get(*first)?;
        for segment in rest {
            match node {
                TreeNode::Branch(children) => node = children.get(*segment)?,
                TreeNode::Leaf(_) => return None,
            }
        }
        match node {
            TreeNode::Leaf(value) => Some(value.as_str()),
            TreeNode::Branch(_) => None,
        }
    }

    /// Looks up a leaf by dotted path, e.g. `HomePage.cta.title`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        let segments: Vec<&str> = path.split(key_path::SEPARATOR).collect();
        self.get_segments(&segments)
    }

    /// Looks up the leaf for a row position.
    #[must_use]
    pub fn get_entry(&self, page: &str, section: &str, key: &str) -> Option<&str> {
        self.get_segments(&key_path::tree_position(page, section, key))
    }

    /// Re-flattens the tree into `(identity, value)` pairs, the inverse of
    /// [`build_tree`].
    #[must_use]
    pub fn flatten(&self) -> Vec<(ContentIdentity, String)> {
        let mut result = Vec::new();
        for (page, node) in &self.pages {
            let TreeNode::Branch(children) = node else {
                continue;
            };
            for (name, child) in children {
                match child {
                    TreeNode::Leaf(value) => {
                        result.push((
                            ContentIdentity::new(page, key_path::GENERAL_SECTION, name, &self.locale),
                            value.clone(),
                        ));
                    }
                    TreeNode::Branch(keys) => {
                        for (key, leaf) in keys {
                            if let TreeNode::Leaf(value) = leaf {
                                result.push((
                                    ContentIdentity::new(page, name, key, &self.locale),
                                    value.clone(),
                                ));
                            }
                        }
                    }
                }
            }
        }
        result
    }

    /// Number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.flatten().len()
    }

    /// The tree in the shape the rendering layer consumes.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.pages.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    }

    /// Inserts a leaf, keeping existing section branches over general leaves.
    fn insert(&mut self, entry: &ContentEntry) -> bool {
        let segments = key_path::tree_position(&entry.page, &entry.section, &entry.key);
        let Some((leaf_name, parents)) = segments.split_last() else {
            return false;
        };

        let mut children = &mut self.pages;
        for segment in parents {
            let node = children
                .entry((*segment).to_string())
                .or_insert_with(|| TreeNode::Branch(BTreeMap::new()));
            if let TreeNode::Leaf(_) = node {
                // A general key with this section's name; the section wins.
                *node = TreeNode::Branch(BTreeMap::new());
            }
            let TreeNode::Branch(next) = node else {
                return false;
            };
            children = next;
        }

        match children.get(*leaf_name) {
            Some(TreeNode::Branch(_)) => false,
            _ => {
                children.insert((*leaf_name).to_string(), TreeNode::Leaf(entry.value.clone()));
                true
            }
        }
    }
}

impl Serialize for ResolvedTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Builds the tree for `locale` from a row snapshot.
///
/// Rows of other locales are ignored. Rows are placed in id order and the
/// first row of a duplicated identity wins.
#[must_use]
pub fn build_tree(locale: &str, rows: &[ContentEntry]) -> ResolvedTree {
    let mut tree = ResolvedTree::empty(locale);
    let mut placed: Vec<&ContentEntry> = Vec::new();
    let mut seen: HashSet<ContentIdentity> = HashSet::new();

    for row in rows.iter().filter(|r| r.locale == locale) {
        // Legacy duplicates: the earliest row holds the identity, as in dedup.
        if !seen.insert(row.identity()) {
            tracing::debug!(identity = %row.identity(), id = row.id.0, "Ignoring duplicate row");
            continue;
        }
        if tree.insert(row) {
            placed.push(row);
        } else {
            tracing::warn!(identity = %row.identity(), "Leaf shadowed by a section of the same name");
            tree.shadowed.push(row.identity());
        }
    }

    // A section created after a general leaf replaced it; report the leaf.
    for row in placed {
        if tree.get_entry(&row.page, &row.section, &row.key).is_none() {
            tracing::warn!(identity = %row.identity(), "Leaf shadowed by a section of the same name");
            tree.shadowed.push(row.identity());
        }
    }

    tree
}

/// Resolves the message tree for `locale`.
///
/// A read failure yields an empty tree; callers treat that as "no
/// translations available", never as an invalid locale.
pub async fn resolve<S: ContentStore>(store: &S, locale: &str) -> ResolvedTree {
    match store.fetch(&ContentFilter::locale(locale)).await {
        Ok(rows) => {
            let tree = build_tree(locale, &rows);
            tracing::debug!(locale, rows = rows.len(), "Resolved message tree");
            tree
        }
        Err(e) => {
            tracing::warn!(locale, error = %e, "Failed to read content rows, using empty tree");
            ResolvedTree::empty(locale)
        }
    }
}
