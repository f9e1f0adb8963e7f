//! Workspace walk that collects key usages from templates.
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;

use crate::config::{
    FileMatcher,
    TemplatesConfig,
};
use crate::indexer::types::{
    IndexerError,
    UsageIndex,
};
use crate::input::source::TemplateFile;
use crate::syntax::analyze_template;

/// Scans a workspace for template key usages.
#[derive(Clone, Debug)]
pub struct WorkspaceIndexer {
    matcher: FileMatcher,
    translation_functions: Vec<String>,
}

impl WorkspaceIndexer {
    /// # Errors
    /// Returns `IndexerError::Matcher` if a template pattern is invalid.
    pub fn new(workspace_root: PathBuf, templates: &TemplatesConfig) -> Result<Self, IndexerError> {
        Ok(Self {
            matcher: FileMatcher::new(workspace_root, templates)?,
            translation_functions: templates.translation_functions.clone(),
        })
    }

    /// Walks the workspace and analyzes every matching template.
    ///
    /// Unreadable files are logged and skipped.
    ///
    /// # Errors
    /// Returns `IndexerError::InvalidRoot` if the workspace root is not a directory.
    pub async fn index_workspace(&self) -> Result<UsageIndex, IndexerError> {
        let workspace_path = self.matcher.workspace_root();
        if !workspace_path.is_dir() {
            return Err(IndexerError::InvalidRoot(workspace_path.display().to_string()));
        }
        tracing::debug!(workspace_path = %workspace_path.display(), "Indexing workspace");

        let files = self.find_template_files(workspace_path);
        let futures: Vec<_> = files.iter().map(|file| self.read_template(file)).collect();
        let templates: Vec<TemplateFile> =
            futures::future::join_all(futures).await.into_iter().flatten().collect();

        let index = self.index_templates(&templates);
        tracing::info!(
            files = index.files_scanned,
            usages = index.usages.len(),
            "Workspace indexed"
        );
        Ok(index)
    }

    /// Analyzes already-loaded templates.
    #[must_use]
    pub fn index_templates(&self, templates: &[TemplateFile]) -> UsageIndex {
        let usages = templates
            .iter()
            .flat_map(|template| analyze_template(template, &self.translation_functions))
            .collect();
        UsageIndex { files_scanned: templates.len(), usages }
    }

    async fn read_template(&self, file_path: &Path) -> Option<TemplateFile> {
        let content = match tokio::fs::read_to_string(file_path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %file_path.display(), error = %e, "Failed to read template");
                return None;
            }
        };

        let relative = file_path.strip_prefix(self.matcher.workspace_root()).ok()?;
        let relative = relative.to_string_lossy().replace('\\', "/");
        let template = TemplateFile::new(relative, content);
        if template.is_none() {
            tracing::debug!(file = %file_path.display(), "Skipping file with unknown language");
        }
        template
    }

    fn find_template_files(&self, workspace_path: &Path) -> Vec<PathBuf> {
        let mut found_files = Vec::new();

        for result in WalkBuilder::new(workspace_path)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            if self.matcher.is_template_file(entry.path()) {
                found_files.push(entry.path().to_path_buf());
            }
        }

        found_files.sort();
        found_files
    }
}
