//! Template source input definitions.

use std::path::Path;

/// A rendering template loaded for static analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path relative to the workspace root.
    pub path: String,
    pub text: String,
    pub language: ProgrammingLanguage,
}

impl TemplateFile {
    /// Creates a template, inferring the language from the path.
    #[must_use]
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Option<Self> {
        let path = path.into();
        let language = ProgrammingLanguage::from_path(&path)?;
        Some(Self { path, text: text.into(), language })
    }
}

/// Supported template languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgrammingLanguage {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl ProgrammingLanguage {
    /// Infers the programming language from file extension.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("tsx") => Some(Self::Tsx),
            Some("ts") => Some(Self::TypeScript),
            Some("jsx") => Some(Self::Jsx),
            Some("js" | "mjs") => Some(Self::JavaScript),
            _ => None,
        }
    }

    #[must_use]
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::tsx("app/page.tsx", Some(ProgrammingLanguage::Tsx))]
    #[case::ts("lib/content.ts", Some(ProgrammingLanguage::TypeScript))]
    #[case::jsx("components/Hero.jsx", Some(ProgrammingLanguage::Jsx))]
    #[case::js("components/Hero.js", Some(ProgrammingLanguage::JavaScript))]
    #[case::mjs("scripts/seed.mjs", Some(ProgrammingLanguage::JavaScript))]
    #[case::multiple_dots("next.config.ts", Some(ProgrammingLanguage::TypeScript))]
    #[case::json("messages/fr.json", None)]
    #[case::no_ext("Dockerfile", None)]
    fn test_from_path(#[case] path: &str, #[case] expected: Option<ProgrammingLanguage>) {
        assert_eq!(ProgrammingLanguage::from_path(path), expected);
    }

    #[rstest]
    fn test_template_file_requires_known_language() {
        assert!(TemplateFile::new("app/page.tsx", "export default 1").is_some());
        assert!(TemplateFile::new("styles/site.css", "body {}").is_none());
    }
}
