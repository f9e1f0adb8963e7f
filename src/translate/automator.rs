//! Single-string translation and the bulk pass over missing target rows.

use std::collections::{
    BTreeMap,
    HashSet,
};

use serde::Serialize;

use super::client::{
    GenerationRequest,
    TextGenerator,
};
use super::parse::{
    ParseOutcome,
    parse_translation_response,
};
use super::prompt::{
    SYSTEM_PROMPT,
    build_user_prompt,
};
use crate::key_path;
use crate::store::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::{
    ContentEntry,
    ContentIdentity,
    NewContentEntry,
};

/// Values sent verbatim to every locale: URLs, paths, e-mail links and
/// strings without letters (prices, phone numbers).
#[must_use]
pub fn is_untranslatable(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    let single_token = !trimmed.contains(char::is_whitespace);
    let looks_like_link = ["http://", "https://", "mailto:", "tel:", "/"]
        .iter()
        .any(|prefix| trimmed.starts_with(prefix));

    (single_token && looks_like_link) || !trimmed.chars().any(char::is_alphabetic)
}

/// Translates strings through a [`TextGenerator`].
#[derive(Debug, Clone)]
pub struct Translator<G> {
    generator: G,
}

impl<G: TextGenerator> Translator<G> {
    pub const fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Translates `source_text` into `target_locales`.
    ///
    /// A failed request becomes a placeholder outcome instead of an error.
    pub async fn translate(
        &self,
        source_text: &str,
        source_locale: &str,
        target_locales: &[String],
    ) -> ParseOutcome {
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_user_prompt(source_text, source_locale, target_locales),
        };

        match self.generator.generate(&request).await {
            Ok(raw) => {
                let outcome = parse_translation_response(&raw, target_locales);
                if outcome.is_failed() {
                    tracing::warn!(response = %raw.chars().take(200).collect::<String>(), "Unparseable translation response");
                }
                outcome
            }
            Err(error) => {
                tracing::warn!(%error, "Translation request failed");
                ParseOutcome::failed(target_locales)
            }
        }
    }

    /// Fills target locales missing for each source-locale row.
    ///
    /// Rows are handled one at a time in id order. Dirty keys are skipped
    /// until renormalized. Only parsed or recovered values are written.
    ///
    /// # Errors
    /// Returns `StoreError` if the snapshot cannot be read. Per-row write
    /// failures are recorded in the report.
    pub async fn translate_missing<S: ContentStore>(
        &self,
        store: &S,
        options: &BulkOptions,
    ) -> Result<BulkTranslateReport, StoreError> {
        let mut source_filter = ContentFilter::locale(&options.source_locale);
        if let Some(page) = &options.page {
            source_filter = source_filter.with_page(page);
        }
        let source_rows = store.fetch(&source_filter).await?;
        let existing: HashSet<ContentIdentity> = store
            .fetch(&ContentFilter::all())
            .await?
            .iter()
            .map(ContentEntry::identity)
            .collect();

        let targets: Vec<String> = options
            .target_locales
            .iter()
            .filter(|locale| **locale != options.source_locale)
            .cloned()
            .collect();

        let mut report = BulkTranslateReport {
            dry_run: options.dry_run,
            source_rows: source_rows.len(),
            ..BulkTranslateReport::default()
        };

        for row in source_rows {
            let identity = row.identity();
            if key_path::is_dirty(&row.page, &row.section, &row.key) {
                tracing::debug!(identity = %identity, "Skipping dirty key");
                report.skipped_dirty += 1;
                continue;
            }

            let missing: Vec<String> = targets
                .iter()
                .filter(|locale| !existing.contains(&identity.with_locale(locale.as_str())))
                .cloned()
                .collect();
            if missing.is_empty() {
                report.skipped_complete += 1;
                continue;
            }

            if options.dry_run {
                report.planned.push(PlannedTranslation { identity, locales: missing });
                continue;
            }

            let (values, outcome_kind) = if is_untranslatable(&row.value) {
                let copies: BTreeMap<String, String> =
                    missing.iter().map(|l| (l.clone(), row.value.clone())).collect();
                report.copied_verbatim += 1;
                (copies, "verbatim")
            } else {
                report.requests += 1;
                let outcome = self.translate(&row.value, &options.source_locale, &missing).await;
                let kind = outcome.kind();
                (outcome.translations().cloned().unwrap_or_default(), kind)
            };

            let failed_locales: Vec<String> =
                missing.iter().filter(|l| !values.contains_key(*l)).cloned().collect();
            if !failed_locales.is_empty() {
                report.failures.push(TranslationFailure {
                    identity: identity.clone(),
                    locales: failed_locales,
                    reason: outcome_kind.to_string(),
                });
            }

            let entries: Vec<NewContentEntry> = values
                .into_iter()
                .map(|(locale, value)| NewContentEntry::new(identity.with_locale(locale), value))
                .collect();
            if entries.is_empty() {
                continue;
            }

            match store.upsert(&entries).await {
                Ok(written) => {
                    tracing::debug!(identity = %identity, written, outcome = outcome_kind, "Translated row");
                    report.translated += written;
                }
                Err(error) => {
                    tracing::error!(identity = %identity, %error, "Failed to write translations");
                    report.failures.push(TranslationFailure {
                        identity,
                        locales: entries.into_iter().map(|e| e.locale).collect(),
                        reason: format!("write failed: {error}"),
                    });
                }
            }
        }

        tracing::info!(
            source_rows = report.source_rows,
            requests = report.requests,
            translated = report.translated,
            failures = report.failures.len(),
            dry_run = report.dry_run,
            "Bulk translation finished"
        );
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOptions {
    pub source_locale: String,
    pub target_locales: Vec<String>,
    /// Restricts the pass to one page.
    pub page: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTranslation {
    pub identity: ContentIdentity,
    pub locales: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationFailure {
    pub identity: ContentIdentity,
    pub locales: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTranslateReport {
    pub dry_run: bool,
    pub source_rows: usize,
    /// Calls made to the text generator.
    pub requests: usize,
    /// Target rows written.
    pub translated: usize,
    pub copied_verbatim: usize,
    pub skipped_complete: usize,
    pub skipped_dirty: usize,
    pub planned: Vec<PlannedTranslation>,
    pub failures: Vec<TranslationFailure>,
}

impl BulkTranslateReport {
    /// Failed locales grouped by flat path.
    #[must_use]
    pub fn failures_by_path(&self) -> BTreeMap<String, Vec<String>> {
        self.failures
            .iter()
            .map(|f| (f.identity.flat_path(), f.locales.clone()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rstest::rstest;

    use super::*;
    use crate::store::MemoryStore;
    use crate::translate::TranslateError;

    /// Replies with queued responses and records prompts.
    #[derive(Debug, Clone, Default)]
    struct ScriptedGenerator {
        replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedGenerator {
        fn with_replies(replies: &[Result<&str, &str>]) -> Self {
            let generator = Self::default();
            generator.replies.lock().extend(
                replies.iter().map(|r| r.map(ToString::to_string).map_err(ToString::to_string)),
            );
            generator
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, TranslateError> {
            self.prompts.lock().push(request.user.clone());
            let reply = self.replies.lock().pop_front();
            match reply {
                Some(Ok(text)) => Ok(text),
                Some(Err(_)) | None => Err(TranslateError::EmptyResponse),
            }
        }
    }

    fn new_row(page: &str, section: &str, key: &str, locale: &str, value: &str) -> NewContentEntry {
        NewContentEntry::new(ContentIdentity::new(page, section, key, locale), value)
    }

    fn options(targets: &[&str]) -> BulkOptions {
        BulkOptions {
            source_locale: "fr".to_string(),
            target_locales: targets.iter().map(ToString::to_string).collect(),
            page: None,
            dry_run: false,
        }
    }

    #[rstest]
    #[case::url("https://cdn.example.com/hero.jpg", true)]
    #[case::path("/images/gallery/1.webp", true)]
    #[case::price("120 €", true)]
    #[case::phone("+33 6 12 34 56 78", true)]
    #[case::sentence("Réservez votre circuit", false)]
    #[case::sentence_with_url("Voir https://example.com", false)]
    fn test_is_untranslatable(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_untranslatable(value), expected);
    }

    #[tokio::test]
    async fn test_translate_request_failure_yields_placeholders() {
        let translator = Translator::new(ScriptedGenerator::with_replies(&[Err("boom")]));

        let outcome = translator.translate("Titre", "fr", &["en".to_string()]).await;

        assert!(outcome.is_failed());
        assert_eq!(outcome.values()["en"], crate::translate::TRANSLATION_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_translate_missing_fills_only_missing_locales() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "title", "es", "Título"),
        ]);
        let generator = ScriptedGenerator::with_replies(&[Ok(r#"{"en": "Title", "de": "Titel"}"#)]);
        let translator = Translator::new(generator.clone());

        let report =
            translator.translate_missing(&store, &options(&["fr", "en", "es", "de"])).await.unwrap();

        assert_eq!(report.requests, 1);
        assert_eq!(report.translated, 2);
        assert!(report.failures.is_empty());
        let prompt = generator.prompts.lock()[0].clone();
        assert!(prompt.contains("en (English), de (German)"));
        assert!(!prompt.contains("es (Spanish)"));
        let es = store.fetch(&ContentFilter::locale("es")).await.unwrap();
        assert_eq!(es[0].value, "Título");
    }

    #[tokio::test]
    async fn test_garbage_reply_writes_nothing_and_continues() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "button", "fr", "Réserver"),
        ]);
        let translator = Translator::new(ScriptedGenerator::with_replies(&[
            Ok("Sorry, I can't do that."),
            Ok("```json\n{\"en\": \"Book now\"}\n```"),
        ]));

        let report = translator.translate_missing(&store, &options(&["en"])).await.unwrap();

        assert_eq!(report.requests, 2);
        assert_eq!(report.translated, 1);
        assert_eq!(report.failures_by_path()["HomePage.cta.title"], vec!["en".to_string()]);
        let en = store.fetch(&ContentFilter::locale("en")).await.unwrap();
        assert_eq!(en.len(), 1);
        assert_eq!(en[0].key, "button");
    }

    #[tokio::test]
    async fn test_verbatim_values_skip_the_generator() {
        let store = MemoryStore::new();
        store.insert_raw([new_row("Gallery", "images", "hero", "fr", "/images/hero.jpg")]);
        let generator = ScriptedGenerator::default();
        let translator = Translator::new(generator.clone());

        let report = translator.translate_missing(&store, &options(&["en", "ar"])).await.unwrap();

        assert_eq!((report.requests, report.copied_verbatim, report.translated), (0, 1, 2));
        assert!(generator.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_calls() {
        let store = MemoryStore::new();
        store.insert_raw([
            new_row("HomePage", "cta", "title", "fr", "Titre"),
            new_row("HomePage", "cta", "cta.button", "fr", "Réserver"),
        ]);
        let generator = ScriptedGenerator::default();
        let translator = Translator::new(generator.clone());
        let options = BulkOptions { dry_run: true, ..options(&["en"]) };

        let report = translator.translate_missing(&store, &options).await.unwrap();

        assert_eq!(report.planned.len(), 1);
        assert_eq!(report.skipped_dirty, 1);
        assert!(generator.prompts.lock().is_empty());
        assert_eq!(store.len(), 2);
    }
}
