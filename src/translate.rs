//! Translation automator over a text-generation API.
//!
//! Responses are parsed defensively into a [`ParseOutcome`], so a bad reply
//! for one item never aborts a bulk pass.

pub mod automator;
pub mod client;
pub mod parse;
pub mod prompt;

use thiserror::Error;

pub use automator::{
    BulkOptions,
    BulkTranslateReport,
    Translator,
    is_untranslatable,
};
pub use client::{
    ChatCompletionsClient,
    GenerationRequest,
    TextGenerator,
};
pub use parse::{
    ParseOutcome,
    TRANSLATION_ERROR_PLACEHOLDER,
    parse_translation_response,
};

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Environment variable '{0}' with the API key is not set")]
    MissingApiKey(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Response contained no message content")]
    EmptyResponse,
}
