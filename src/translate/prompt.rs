//! Prompt construction.

use serde_json::json;

pub const SYSTEM_PROMPT: &str = "You are a professional website translator for a travel booking \
site. Translate literally, keep markup, placeholders in braces and proper nouns unchanged. \
Reply with a single flat JSON object mapping each requested locale code to its translation, \
and nothing else.";

/// Human-readable name for prompts; unknown codes are passed through.
#[must_use]
pub fn locale_name(locale: &str) -> &str {
    match locale {
        "fr" => "French",
        "en" => "English",
        "es" => "Spanish",
        "de" => "German",
        "it" => "Italian",
        "nl" => "Dutch",
        "ar" => "Arabic",
        "pt" => "Portuguese",
        other => other,
    }
}

/// Builds the user message for one source string.
#[must_use]
pub fn build_user_prompt(source_text: &str, source_locale: &str, target_locales: &[String]) -> String {
    let targets: Vec<String> = target_locales
        .iter()
        .map(|locale| format!("{locale} ({})", locale_name(locale)))
        .collect();
    let example: serde_json::Map<String, serde_json::Value> = target_locales
        .iter()
        .map(|locale| (locale.clone(), json!("...")))
        .collect();

    format!(
        "Translate the following {} text into: {}.\nReturn exactly this shape: {}\n\nText:\n{}",
        locale_name(source_locale),
        targets.join(", "),
        serde_json::Value::Object(example),
        source_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_lists_targets() {
        let prompt =
            build_user_prompt("Réserver", "fr", &["en".to_string(), "ar".to_string()]);

        assert!(prompt.contains("French text"));
        assert!(prompt.contains("en (English), ar (Arabic)"));
        assert!(prompt.contains(r#"{"ar":"...","en":"..."}"#));
        assert!(prompt.ends_with("Réserver"));
    }

    #[test]
    fn test_unknown_locale_passthrough() {
        assert_eq!(locale_name("sw"), "sw");
    }
}
