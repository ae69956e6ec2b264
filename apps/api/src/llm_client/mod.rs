//! Provider Router: the single point of entry for all remote LLM calls.
//!
//! ARCHITECTURAL RULE: No other module may talk to a completion endpoint directly.
//! All LLM interactions MUST go through `CompletionProvider`.
//!
//! Four back-ends are supported (groq, together, openrouter, huggingface); see `providers`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{MissingSecret, Secrets};

/// Largest backoff exponent; later retries wait 64 s each.
const MAX_BACKOFF_SHIFT: u32 = 6;

pub mod parser;
pub mod providers;

pub use providers::{ProviderSelection, ProviderTag};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    MissingSecret(#[from] MissingSecret),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedEnvelope(String),

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Sampling parameters. Chat back-ends read `max_tokens`, text back-ends `max_new_tokens`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_new_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1500,
            max_new_tokens: 1024,
        }
    }
}

/// Immutable description of one completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub provider: String,
    pub model: String,
    pub sampling: Sampling,
}

impl CompletionRequest {
    pub fn new(prompt: &str, system_prompt: &str, provider: &str, model: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            sampling: Sampling::default(),
        }
    }
}

/// Capability shared by every back-end: send a completion, get one string back.
///
/// Carried in `AppState` as `Arc<dyn CompletionProvider>`; tests inject stubs.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Production `CompletionProvider`: resolves the provider table, the secret, and
/// performs the HTTP exchange with bounded retries.
#[derive(Clone)]
pub struct ProviderRouter {
    client: Client,
    secrets: Secrets,
    max_attempts: u32,
    base_url: Option<String>,
}

impl ProviderRouter {
    pub fn with_limits(secrets: Secrets, timeout_secs: u64, max_attempts: u32) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            secrets,
            max_attempts: max_attempts.max(1),
            base_url: None,
        }
    }

    /// Sends every provider's requests to `url` instead of its public endpoint
    /// (a self-hosted gateway speaking the same wire shapes).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// `complete(prompt, system_prompt, provider, model) → raw_text`.
    #[cfg(test)]
    pub async fn complete_text(
        &self,
        prompt: &str,
        system_prompt: &str,
        provider: &str,
        model: &str,
    ) -> Result<String, LlmError> {
        self.complete(&CompletionRequest::new(prompt, system_prompt, provider, model))
            .await
    }

    /// Posts `body` and returns the response text of the first 2xx reply.
    /// Retries on 429, 5xx and transport errors with exponential backoff.
    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        body: Vec<u8>,
    ) -> Result<String, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 || status.is_server_error() {
                warn!("LLM API returned {}: {}", status, text);
                last_error = Some(LlmError::Upstream {
                    status: status.as_u16(),
                    body: text,
                });
                continue;
            }

            if !status.is_success() {
                return Err(LlmError::Upstream {
                    status: status.as_u16(),
                    body: text,
                });
            }

            return Ok(text);
        }

        Err(last_error.unwrap_or(LlmError::Upstream {
            status: 0,
            body: format!("no response after {} attempts", self.max_attempts),
        }))
    }
}

/// Exponential backoff before retry `attempt` (1-based): 1s, 2s, 4s, capped at 64s.
fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_secs(1u64 << shift)
}

#[async_trait]
impl CompletionProvider for ProviderRouter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let tag: ProviderTag = request.provider.parse()?;
        let selection = ProviderSelection::resolve(tag, &request.model);
        // Resolve the secret before anything touches the network.
        let api_key = self.secrets.require(selection.secret_name)?;
        let body = selection.request_body(request)?;
        let url = self.base_url.as_deref().unwrap_or(selection.url());

        debug!(
            provider = %selection.tag,
            model = %selection.model,
            prompt_chars = request.prompt.len(),
            "Sending completion request"
        );

        let start = std::time::Instant::now();
        let raw = self.post_with_retry(url, api_key, body).await?;
        let output = selection.extract_output(&raw)?;

        debug!(
            provider = %selection.tag,
            elapsed_ms = start.elapsed().as_millis(),
            output_chars = output.len(),
            "Completion received"
        );

        Ok(output)
    }
}
