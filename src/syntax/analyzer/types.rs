//! Types for the analyzer module

use thiserror::Error;
use tree_sitter::Node;

use crate::types::SourceRange;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Failed to set tree-sitter language: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),

    #[error("Failed to parse source")]
    ParseFailed,
}

/// A translator binding such as `const t = useTranslations("HomePage")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTransFnDetail {
    /// Local name the translator is bound to (e.g., `t`).
    pub trans_fn_name: String,
    /// Namespace passed to the factory; `None` when called without one.
    pub namespace: Option<String>,
}

impl GetTransFnDetail {
    #[must_use]
    pub fn new(trans_fn_name: impl Into<String>, namespace: Option<String>) -> Self {
        Self { trans_fn_name: trans_fn_name.into(), namespace }
    }
}

/// A translator call with a literal key, before scope resolution.
#[derive(Debug, Clone)]
pub struct CallTransFnDetail<'a> {
    pub trans_fn_name: String,
    pub key: String,
    pub key_node: Node<'a>,
}

/// A translator call resolved against its binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransFnCall {
    /// Key literal as written at the call site.
    pub key: String,
    /// Namespace of the binding in scope.
    pub namespace: Option<String>,
    /// Range of the key argument.
    pub range: SourceRange,
}
