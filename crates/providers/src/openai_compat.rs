//! OpenAI-compatible completion provider.
//!
//! Works with OpenAI and any endpoint exposing `/chat/completions` with the
//! same request and response shape (OpenRouter, vLLM, Ollama, ...).
//!
//! One request per call, no retries. A success status with a body we can't
//! interpret yields an empty reply rather than an error.

use async_trait::async_trait;
use averygate_core::error::CompletionError;
use averygate_core::message::Turn;
use averygate_core::provider::{Completion, CompletionRequest, Provider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// An OpenAI-compatible completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, CompletionError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            Some(api_key.into()),
            Duration::from_secs(30),
        )
    }

    /// Convert turns to the wire format, preserving order.
    fn to_api_messages(turns: &[Turn]) -> Vec<ApiMessage<'_>> {
        turns
            .iter()
            .map(|t| ApiMessage {
                role: t.role().as_str(),
                content: t.content(),
            })
            .collect()
    }

    fn api_key(&self) -> Result<&str, CompletionError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| CompletionError::NotConfigured("OPENAI_API_KEY".into()))
    }

    /// Pull the reply text out of a success body. Anything unexpected
    /// degrades to an empty completion.
    fn parse_reply(provider: &str, body: &str) -> Completion {
        let api_response: ApiResponse = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(provider, error = %e, "Failed to parse completion response");
                return Completion::empty();
            }
        };

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if text.is_empty() {
            warn!(provider, "Completion response carried no reply text");
        }

        Completion {
            text,
            model: api_response.model,
        }
    }
}

fn transport_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else {
        CompletionError::Transport(e.to_string())
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_configured(&self) -> Result<(), CompletionError> {
        self.api_key().map(|_| ())
    }

    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<Completion, CompletionError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);

        let body = ApiRequest {
            model: &request.params.model,
            messages: Self::to_api_messages(request.prompt.turns()),
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        };

        debug!(
            provider = %self.name,
            model = %request.params.model,
            turns = request.prompt.len(),
            est_tokens = request.prompt.estimated_tokens(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %error_body, "Completion API error");
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let text = response.text().await.map_err(transport_error)?;
        Ok(Self::parse_reply(&self.name, &text))
    }

    async fn health_check(&self) -> Result<bool, CompletionError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiReplyMessage {
    #[serde(default)]
    content: Option<String>,
}
