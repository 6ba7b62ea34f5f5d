//! Dispatcher for the Gemini `generateContent` endpoint.
//!
//! Each call to [`GeminiDispatcher::request`] becomes exactly one task on the
//! shared [`RequestQueue`]. The dispatcher performs no throttling or retrying
//! of its own; it only shapes the request and classifies the response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::RequestError;
use crate::queue::RequestQueue;

use super::generator::TextGenerator;
use super::payload::{GenerateContentRequest, GenerateContentResponse};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-pro";
/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`GeminiDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// Base API URL (e.g., `https://generativelanguage.googleapis.com/v1`).
    pub base_url: String,
    /// Model identifier placed in the request path.
    pub model: String,
    /// API key sent as the `key` query parameter.
    pub api_key: Option<String>,
    /// HTTP timeout applied to every attempt.
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GeminiConfig {
    /// Constructs configuration with explicit API settings.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Sends generation requests through a [`RequestQueue`].
#[derive(Debug, Clone)]
pub struct GeminiDispatcher {
    config: GeminiConfig,
    client: Client,
    queue: RequestQueue,
}

impl GeminiDispatcher {
    /// Creates a dispatcher that submits its calls to `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Configuration`] when the HTTP client cannot
    /// be built.
    pub fn new(config: GeminiConfig, queue: RequestQueue) -> Result<Self, RequestError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| RequestError::Configuration {
                message: format!("failed to configure AI HTTP client: {error}"),
            })?;

        Ok(Self {
            config,
            client,
            queue,
        })
    }

    /// Returns the configuration this dispatcher was built with.
    #[must_use]
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Generates text for `prompt`, waiting for the queue to run the call.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Configuration`] when no API key is configured; the
    ///   queue is not touched.
    /// - [`RequestError::Transport`] for non-success statuses.
    /// - [`RequestError::Application`] for success statuses carrying an
    ///   `error` payload.
    /// - [`RequestError::Network`] and [`RequestError::Decode`] for transport
    ///   and decoding failures.
    pub async fn request(&self, prompt: &str) -> Result<String, RequestError> {
        let api_key = self.extract_api_key()?;
        let call = GenerationCall {
            client: self.client.clone(),
            endpoint: self.config.endpoint(),
            api_key: api_key.to_owned(),
            body: Arc::new(GenerateContentRequest::for_prompt(prompt)),
        };

        self.queue.enqueue(move || call.clone().send()).await
    }

    fn extract_api_key(&self) -> Result<&str, RequestError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RequestError::Configuration {
                message: concat!(
                    "AI API key is required (use --ai-api-key, ",
                    "PRPULSE_AI_API_KEY, or GOOGLE_AI_KEY)"
                )
                .to_owned(),
            })
    }
}

#[async_trait]
impl TextGenerator for GeminiDispatcher {
    async fn generate(&self, prompt: &str) -> Result<String, RequestError> {
        self.request(prompt).await
    }
}

/// Everything one attempt needs; cloned for every retry.
#[derive(Clone)]
struct GenerationCall {
    client: Client,
    endpoint: String,
    api_key: String,
    body: Arc<GenerateContentRequest>,
}

impl GenerationCall {
    async fn send(self) -> Result<String, RequestError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(self.body.as_ref())
            .send()
            .await
            .map_err(|error| RequestError::Network {
                message: error.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Transport {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let payload: GenerateContentResponse =
            response.json().await.map_err(|error| RequestError::Decode {
                message: error.without_url().to_string(),
            })?;
        payload.into_text()
    }
}

/// Picks `error.message` from a failure body, or the status reason text.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<GenerateContentResponse>(body)
        .ok()
        .and_then(|payload| payload.error)
        .map(|error| error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("status {}", status.as_u16()), ToOwned::to_owned)
        })
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;
