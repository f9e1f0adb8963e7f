use std::collections::HashSet;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "templates.includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Every locale the site publishes.
    pub locales: Vec<String>,

    /// Primary authored locale; second step of the fallback chain.
    pub default_locale: String,

    /// Reference inventory for coverage diffs and the translation source.
    pub source_locale: String,

    pub store: StoreConfig,
    pub maintenance: MaintenanceConfig,
    pub templates: TemplatesConfig,
    pub translation: TranslationApiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// SQLite database file, relative to the workspace root.
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { database_path: "content.db".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenanceConfig {
    /// Rows per delete call; bounded by backend request-size limits.
    pub delete_batch_size: usize,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self { delete_batch_size: 100 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplatesConfig {
    pub include_patterns: Vec<String>,

    /// Administrative templates are excluded from translation coverage.
    pub exclude_patterns: Vec<String>,

    /// Functions returning a translator bound to a namespace.
    pub translation_functions: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*.{js,jsx,ts,tsx}".to_string()],
            exclude_patterns: vec![
                "**/node_modules/**".to_string(),
                "**/.next/**".to_string(),
                "**/admin/**".to_string(),
            ],
            translation_functions: vec![
                "useTranslations".to_string(),
                "getTranslations".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationApiConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Pause between consecutive requests.
    pub request_interval_ms: u64,
}

impl Default for TranslationApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "TRANSLATION_API_KEY".to_string(),
            temperature: 0.1,
            timeout_secs: 60,
            request_interval_ms: 250,
        }
    }
}

impl EngineSettings {
    /// Locales other than `locale`, in configured order.
    #[must_use]
    pub fn other_locales(&self, locale: &str) -> Vec<String> {
        self.locales.iter().filter(|l| *l != locale).cloned().collect()
    }

    /// # Errors
    /// - Empty or duplicated locales
    /// - Default or source locale not in `locales`
    /// - Zero batch size
    /// - Invalid glob pattern
    /// - Empty translation API settings
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.locales.is_empty() {
            errors.push(ValidationError::new(
                "locales",
                "At least one locale is required. Example: [\"fr\", \"en\"]",
            ));
        }

        let mut seen = HashSet::new();
        for (index, locale) in self.locales.iter().enumerate() {
            if locale.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("locales[{index}]"),
                    "The locale cannot be empty",
                ));
            } else if !seen.insert(locale.as_str()) {
                errors.push(ValidationError::new(
                    format!("locales[{index}]"),
                    format!("Duplicate locale '{locale}'"),
                ));
            }
        }

        for (field, locale) in
            [("defaultLocale", &self.default_locale), ("sourceLocale", &self.source_locale)]
        {
            if !self.locales.contains(locale) {
                errors.push(ValidationError::new(
                    field,
                    format!("Locale '{locale}' must be listed in 'locales'"),
                ));
            }
        }

        if self.store.database_path.is_empty() {
            errors.push(ValidationError::new(
                "store.databasePath",
                "The path cannot be empty. Example: \"content.db\"",
            ));
        }

        if self.maintenance.delete_batch_size == 0 {
            errors.push(ValidationError::new(
                "maintenance.deleteBatchSize",
                "The batch size must be at least 1",
            ));
        }

        if self.templates.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "templates.includePatterns",
                "At least one pattern is required. Example: [\"**/*.{js,ts,tsx}\"]",
            ));
        }

        for (index, pattern) in self.templates.include_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("templates.includePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.templates.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("templates.excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if self.templates.translation_functions.is_empty() {
            errors.push(ValidationError::new(
                "templates.translationFunctions",
                "At least one function is required. Example: [\"useTranslations\"]",
            ));
        }

        for (field, value) in [
            ("translation.baseUrl", &self.translation.base_url),
            ("translation.model", &self.translation.model),
            ("translation.apiKeyEnv", &self.translation.api_key_env),
        ] {
            if value.is_empty() {
                errors.push(ValidationError::new(field, "The value cannot be empty"));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            locales: ["fr", "en", "es", "de", "it", "nl", "ar"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            default_locale: "fr".to_string(),
            source_locale: "fr".to_string(),
            store: StoreConfig::default(),
            maintenance: MaintenanceConfig::default(),
            templates: TemplatesConfig::default(),
            translation: TranslationApiConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = EngineSettings::default();

        assert_that!(settings.validate(), ok(anything()));
        assert_that!(settings.locales, len(eq(7)));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"defaultLocale": "en", "maintenance": {"deleteBatchSize": 50}}"#;

        let settings: EngineSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.default_locale, eq("en"));
        assert_that!(settings.source_locale, eq("fr"));
        assert_that!(settings.maintenance.delete_batch_size, eq(50));
        assert_that!(settings.templates.include_patterns, len(eq(1)));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let settings: EngineSettings = serde_json::from_str("{}").unwrap();

        assert_that!(settings.store.database_path, eq("content.db"));
        assert_that!(settings.templates.include_patterns, elements_are![eq("**/*.{js,jsx,ts,tsx}")]);
        assert_that!(settings.templates.exclude_patterns, contains(eq("**/admin/**")));
        assert_that!(settings.translation.api_key_env, eq("TRANSLATION_API_KEY"));
    }

    #[rstest]
    fn other_locales_excludes_source() {
        let settings = EngineSettings::default();

        let others = settings.other_locales("fr");

        assert_that!(others, len(eq(6)));
        assert_that!(others, not(contains(eq("fr"))));
    }

    #[rstest]
    fn validate_default_locale_not_listed() {
        let settings =
            EngineSettings { default_locale: "pt".to_string(), ..EngineSettings::default() };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("defaultLocale")),
                field!(ValidationError.message, contains_substring("'pt'"))
            ]])
        );
    }

    #[rstest]
    fn validate_duplicate_locale() {
        let settings = EngineSettings {
            locales: vec!["fr".to_string(), "en".to_string(), "fr".to_string()],
            ..EngineSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("locales[2]")),
                field!(ValidationError.message, contains_substring("Duplicate"))
            ]])
        );
    }

    #[rstest]
    fn validate_zero_batch_size() {
        let settings = EngineSettings {
            maintenance: MaintenanceConfig { delete_batch_size: 0 },
            ..EngineSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![field!(
                ValidationError.field_path,
                eq("maintenance.deleteBatchSize")
            )])
        );
    }

    #[rstest]
    fn validate_invalid_exclude_pattern() {
        let mut settings = EngineSettings::default();
        settings.templates.exclude_patterns.push("invalid[pattern".to_string());

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("templates.excludePatterns[3]")),
                field!(ValidationError.message, contains_substring("Invalid glob pattern"))
            ]])
        );
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let settings = EngineSettings {
            locales: vec![],
            ..EngineSettings::default()
        };

        let errors = settings.validate().unwrap_err();
        let config_error = ConfigError::ValidationErrors(errors);

        let error_message = format!("{config_error}");
        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. locales"));
        assert_that!(error_message, contains_substring("2. defaultLocale"));
        assert_that!(error_message, contains_substring("3. sourceLocale"));
    }
}
