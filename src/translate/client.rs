//! Text-generation client for OpenAI-compatible chat completions APIs.
//! Connection pooling via reqwest, a minimum interval between requests and
//! retries on 429 / 5xx / timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::{
    Duration,
    Instant,
};

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::TranslateError;
use crate::config::TranslationApiConfig;

const MAX_RATE_LIMIT_RETRIES: u32 = 3;
const MAX_SERVER_ERROR_RETRIES: u32 = 2;

/// One prompt for the text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
}

/// Seam for the external text-generation API.
pub trait TextGenerator: Send + Sync {
    /// Returns the raw text of the model reply.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

/// Chat completions client (`POST {base_url}/v1/chat/completions`).
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    /// Earliest time the next request may be sent.
    next_allowed: Arc<tokio::sync::Mutex<Instant>>,
    min_interval: Duration,
}

impl ChatCompletionsClient {
    /// Builds a client, reading the API key from the configured variable.
    ///
    /// # Errors
    /// Returns `TranslateError::MissingApiKey` if the variable is unset.
    pub fn from_config(config: &TranslationApiConfig) -> Result<Self, TranslateError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| TranslateError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    /// # Errors
    /// Returns `TranslateError::Client` if the HTTP client cannot be built.
    pub fn new(config: &TranslationApiConfig, api_key: String) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(TranslateError::Client)?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            next_allowed: Arc::new(tokio::sync::Mutex::new(Instant::now())),
            min_interval: Duration::from_millis(config.request_interval_ms),
        })
    }

    /// Waits until the minimum interval since the previous request has passed.
    async fn rate_limit_wait(&self) {
        let mut next = self.next_allowed.lock().await;
        let now = Instant::now();
        if *next > now {
            tokio::time::sleep(*next - now).await;
        }
        *next = Instant::now() + self.min_interval;
    }

    /// Sends the request, retrying 429 (honoring `Retry-After`), 5xx with
    /// exponential backoff, and one timeout.
    async fn send_with_retry(&self, body: &serde_json::Value) -> Result<reqwest::Response, TranslateError> {
        let mut rate_limit_attempts: u32 = 0;
        let mut server_error_attempts: u32 = 0;
        let mut timeout_retried = false;

        loop {
            self.rate_limit_wait().await;

            let result = self
                .http
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    if rate_limit_attempts >= MAX_RATE_LIMIT_RETRIES {
                        return Err(TranslateError::RateLimited { attempts: rate_limit_attempts + 1 });
                    }
                    let wait = resp
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .map_or_else(
                            || Duration::from_secs(1 << rate_limit_attempts),
                            Duration::from_secs,
                        );
                    warn!(attempt = rate_limit_attempts, wait = ?wait, "Rate limited, retrying");
                    tokio::time::sleep(wait).await;
                    rate_limit_attempts += 1;
                }
                Ok(resp) if resp.status().is_server_error() => {
                    if server_error_attempts >= MAX_SERVER_ERROR_RETRIES {
                        return Err(TranslateError::Status {
                            status: resp.status().as_u16(),
                            body: String::new(),
                        });
                    }
                    let wait = Duration::from_millis(500 << server_error_attempts);
                    warn!(
                        attempt = server_error_attempts,
                        status = resp.status().as_u16(),
                        wait = ?wait,
                        "Server error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    server_error_attempts += 1;
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body_text = resp.text().await.unwrap_or_default();
                    return Err(TranslateError::Status {
                        status,
                        body: body_text.chars().take(200).collect(),
                    });
                }
                Err(e) if e.is_timeout() => {
                    if timeout_retried {
                        return Err(TranslateError::Timeout);
                    }
                    warn!("Request timed out, retrying once");
                    timeout_retried = true;
                }
                Err(e) => return Err(TranslateError::Request(e)),
            }
        }
    }
}

impl TextGenerator for ChatCompletionsClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, TranslateError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "temperature": self.temperature,
            "stream": false
        });

        let response = self.send_with_retry(&body).await?;
        let parsed: ChatResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(TranslateError::EmptyResponse)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_base_url() {
        let config = TranslationApiConfig {
            base_url: "https://api.example.com/".to_string(),
            ..TranslationApiConfig::default()
        };

        let client = ChatCompletionsClient::new(&config, "key".to_string()).unwrap();

        assert_eq!(client.base_url, "https://api.example.com");
        assert_eq!(client.min_interval, Duration::from_millis(config.request_interval_ms));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = TranslationApiConfig {
            api_key_env: "CONTENT_ENGINE_TEST_UNSET_KEY".to_string(),
            ..TranslationApiConfig::default()
        };

        let result = ChatCompletionsClient::from_config(&config);

        assert!(matches!(result, Err(TranslateError::MissingApiKey(name)) if name == "CONTENT_ENGINE_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_chat_response_shape() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"en\":\"Title\"}"}}]}"#;

        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.choices.len(), 1);
    }
}
