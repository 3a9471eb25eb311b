//! Completion provider implementations for averygate.
//!
//! All providers implement the `averygate_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use averygate_config::CompletionConfig;
use averygate_core::error::CompletionError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured completion provider.
///
/// A missing API key is not an error here; the provider reports it on the
/// first chat request instead.
pub fn build_from_config(
    config: &CompletionConfig,
) -> Result<Arc<dyn averygate_core::Provider>, CompletionError> {
    let provider = OpenAiCompatProvider::new(
        "openai",
        &config.api_url,
        config.api_key.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}
