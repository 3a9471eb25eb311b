//! Provider trait: the abstraction over language-model completion backends.
//!
//! A Provider knows how to send an assembled [`Prompt`] to an LLM and return
//! the reply text. The chat service never sees HTTP: it calls `complete()`
//! without knowing which backend answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::message::Prompt;

/// Fixed generation parameters applied to every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// Sampling temperature; kept low for concise, repeatable replies
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    600
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// A single completion request: a read-only prompt plus generation parameters.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a Prompt,
    pub params: &'a ModelParams,
}

/// A completed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// The reply text. Empty when the upstream body could not be interpreted.
    pub text: String,

    /// Which model actually responded, when reported
    pub model: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The core Provider trait.
///
/// Implementations must enforce their own request timeout and must not
/// retry: one call, one upstream attempt.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Fail fast when a required credential is missing, before any work is
    /// done on the caller's behalf.
    fn ensure_configured(&self) -> std::result::Result<(), CompletionError> {
        Ok(())
    }

    /// Send the prompt and wait for the complete reply.
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> std::result::Result<Completion, CompletionError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, CompletionError> {
        Ok(true)
    }
}
