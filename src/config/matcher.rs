//! File pattern matcher for rendering templates.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};

use super::TemplatesConfig;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid pattern '{pattern}' in templates.{field}: {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),
}

/// Matches files against the configured template patterns.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    workspace_root: PathBuf,
    include_set: GlobSet,
    exclude_set: GlobSet,
}

impl FileMatcher {
    /// Compiles the include and exclude patterns of `templates`.
    pub fn new(workspace_root: PathBuf, templates: &TemplatesConfig) -> Result<Self, MatcherError> {
        Ok(Self {
            include_set: compile("includePatterns", &templates.include_patterns)?,
            exclude_set: compile("excludePatterns", &templates.exclude_patterns)?,
            workspace_root,
        })
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Returns true if the path matches `includePatterns` but not `excludePatterns`.
    ///
    /// The path must be absolute and under the workspace root.
    #[must_use]
    pub fn is_template_file(&self, absolute_path: &Path) -> bool {
        let Some(relative_path) = absolute_path.strip_prefix(&self.workspace_root).ok() else {
            return false;
        };

        self.is_template_file_relative(relative_path)
    }

    /// Returns true if the path matches `includePatterns` but not `excludePatterns`.
    ///
    /// The path must be relative to the workspace root.
    #[must_use]
    pub fn is_template_file_relative(&self, relative_path: &Path) -> bool {
        self.include_set.is_match(relative_path) && !self.exclude_set.is_match(relative_path)
    }
}

fn compile(field: &'static str, patterns: &[String]) -> Result<GlobSet, MatcherError> {
    patterns
        .iter()
        .try_fold(GlobSetBuilder::new(), |mut builder, pattern| {
            let glob = Glob::new(pattern).map_err(|source| MatcherError::InvalidPattern {
                field,
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
            Ok::<_, MatcherError>(builder)
        })?
        .build()
        .map_err(MatcherError::from)
}
