pub mod analyzer;

use crate::input::source::TemplateFile;
use crate::ir::key_usage::KeyUsageReference;

/// Analyzes a template and extracts its key usages.
///
/// A template that fails to parse yields no usages.
#[must_use]
pub fn analyze_template(
    file: &TemplateFile,
    translation_functions: &[String],
) -> Vec<KeyUsageReference> {
    let language = file.language.tree_sitter_language();

    let trans_fn_calls = match analyzer::extractor::analyze_trans_fn_calls(
        &file.text,
        &language,
        translation_functions,
    ) {
        Ok(calls) => calls,
        Err(error) => {
            tracing::warn!(file = %file.path, %error, "Failed to analyze template");
            return Vec::new();
        }
    };

    trans_fn_calls
        .into_iter()
        .map(|call| KeyUsageReference {
            namespace: call.namespace,
            key: call.key,
            file: file.path.clone(),
            range: call.range,
        })
        .collect()
}
