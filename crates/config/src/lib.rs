//! Configuration loading, validation, and management for averygate.
//!
//! Loads configuration from a TOML file (`--config`, `$AVERYGATE_CONFIG`, or
//! `~/.averygate/config.toml`) with environment variable overrides, then
//! validates it. Missing upstream credentials are deliberately *not*
//! validation errors: each endpoint reports its own missing credential when
//! it is called, so one unconfigured upstream never keeps the server down.

use averygate_core::provider::ModelParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default instruction turn placed at the top of every prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Avery, an assistant for EOT Labs. Be concise, helpful, and use organization data when provided.";

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tabular records service
    #[serde(default)]
    pub records: RecordsConfig,

    /// Language-model completion service
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Chat session behaviour
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gateway", &self.gateway)
            .field("records", &self.records)
            .field("completion", &self.completion)
            .field("chat", &self.chat)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served under `/chat-ui`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Allowed CORS origins. `["*"]` = any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl GatewayConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base (workspace) identifier, e.g. `appXXXXXXXXXXXXXX`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,

    #[serde(default = "default_records_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_records_url() -> String {
    "https://api.airtable.com/v0".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_id: None,
            api_url: default_records_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for RecordsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordsConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_id", &self.base_id)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_completion_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    600
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_completion_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CompletionConfig {
    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Instruction turn placed first in every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum turns stored per session
    #[serde(default = "default_retention_window")]
    pub retention_window: usize,

    /// Idle time after which a session is forgotten. 0 = never.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Upper bound on live sessions; the least recently used is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_retention_window() -> usize {
    20
}
fn default_session_ttl_secs() -> u64 {
    2 * 60 * 60
}
fn default_max_sessions() -> usize {
    10_000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retention_window: default_retention_window(),
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl AppConfig {
    /// Load configuration and apply process environment overrides.
    ///
    /// Path resolution: `path` argument, then `$AVERYGATE_CONFIG`, then
    /// `~/.averygate/config.toml`. Environment variables:
    /// - `AIRTABLE_API_KEY`, `AIRTABLE_BASE_ID`
    /// - `OPENAI_API_KEY`, `AVERYGATE_MODEL`
    /// - `AVERY_SYSTEM_PROMPT`
    /// - `AVERYGATE_HOST`, `PORT`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = Self::resolve_path(path);
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Which file `load` would read.
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("AVERYGATE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::config_dir().join("config.toml")),
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".averygate")
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("AIRTABLE_API_KEY") {
            self.records.api_key = Some(key);
        }
        if let Some(base) = get("AIRTABLE_BASE_ID") {
            self.records.base_id = Some(base);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Some(model) = get("AVERYGATE_MODEL") {
            self.completion.model = model;
        }
        if let Some(prompt) = get("AVERY_SYSTEM_PROMPT") {
            self.chat.system_prompt = prompt;
        }
        if let Some(host) = get("AVERYGATE_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = get("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::ValidationError(
                "completion.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.completion.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "completion.max_tokens must be > 0".into(),
            ));
        }

        if self.chat.retention_window == 0 {
            return Err(ConfigError::ValidationError(
                "chat.retention_window must be > 0".into(),
            ));
        }

        if self.chat.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "chat.max_sessions must be > 0".into(),
            ));
        }

        if self.records.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// A copy safe to print: every credential replaced by a marker.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.records.api_key.is_some() {
            copy.records.api_key = Some("[REDACTED]".into());
        }
        if copy.completion.api_key.is_some() {
            copy.completion.api_key = Some("[REDACTED]".into());
        }
        copy
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
