//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use parley_core::{SamplingOptions, SessionPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Session retention rules
    #[serde(default)]
    pub session: SessionConfig,

    /// Text-generation backend
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Page scraping and web search
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5001
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "redis" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_store_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout applied to each individual store command.
    #[serde(default = "default_store_timeout")]
    pub op_timeout_secs: u64,
}

fn default_store_backend() -> String {
    "redis".into()
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".into()
}
fn default_store_timeout() -> u64 {
    5
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_url: default_redis_url(),
            connect_timeout_secs: default_store_timeout(),
            op_timeout_secs: default_store_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_max_history")]
    pub max_history_messages: usize,
}

/// Upper bound on `session.ttl_secs` (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn default_ttl_secs() -> u64 {
    600
}
fn default_max_history() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_history_messages: default_max_history(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// "ollama" or "openai_compat"
    #[serde(default = "default_inference_backend")]
    pub backend: String,

    #[serde(default = "default_inference_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Only used by OpenAI-compatible backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_inference_backend() -> String {
    "ollama".into()
}
fn default_inference_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.1:8b".into()
}
fn default_inference_timeout() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_top_k() -> u32 {
    40
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: default_inference_backend(),
            base_url: default_inference_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_inference_timeout(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Whether page scraping is offered at all
    #[serde(default = "default_true")]
    pub scrape_enabled: bool,

    /// Whether web search is offered at all
    #[serde(default = "default_true")]
    pub search_enabled: bool,

    #[serde(default = "default_context_timeout")]
    pub timeout_secs: u64,

    /// Maximum characters of page text handed to the prompt
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_search_results")]
    pub search_results: usize,

    #[serde(default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_context_timeout() -> u64 {
    10
}
fn default_max_chars() -> usize {
    5000
}
fn default_search_results() -> usize {
    5
}
fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

impl ContextConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            scrape_enabled: true,
            search_enabled: true,
            timeout_secs: default_context_timeout(),
            max_chars: default_max_chars(),
            search_results: default_search_results(),
            search_url: default_search_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml),
    /// then apply `PARLEY_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply `PARLEY_*` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
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

    /// Apply environment overrides through `lookup` (highest priority).
    ///
    /// - `PARLEY_REDIS_URL`
    /// - `PARLEY_INFERENCE_URL`
    /// - `PARLEY_MODEL`
    /// - `PARLEY_API_KEY`
    /// - `PARLEY_SESSION_TTL_SECS`
    /// - `PARLEY_MAX_HISTORY`
    /// - `PARLEY_PORT`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PARLEY_REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Some(url) = lookup("PARLEY_INFERENCE_URL") {
            self.inference.base_url = url;
        }
        if let Some(model) = lookup("PARLEY_MODEL") {
            self.inference.model = model;
        }
        if let Some(key) = lookup("PARLEY_API_KEY") {
            self.inference.api_key = Some(key);
        }
        if let Some(ttl) = lookup("PARLEY_SESSION_TTL_SECS") {
            self.session.ttl_secs = parse_env("PARLEY_SESSION_TTL_SECS", &ttl)?;
        }
        if let Some(max) = lookup("PARLEY_MAX_HISTORY") {
            self.session.max_history_messages = parse_env("PARLEY_MAX_HISTORY", &max)?;
        }
        if let Some(port) = lookup("PARLEY_PORT") {
            self.gateway.port = parse_env("PARLEY_PORT", &port)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_secs == 0 || self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "session.ttl_secs must be between 1 and {MAX_SESSION_TTL_SECS}"
            )));
        }

        if self.session.max_history_messages == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_history_messages must be greater than 0".into(),
            ));
        }

        if self.inference.temperature < 0.0 || self.inference.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !matches!(self.store.backend.as_str(), "redis" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown store.backend '{}', expected 'redis' or 'memory'",
                self.store.backend
            )));
        }

        if !matches!(self.inference.backend.as_str(), "ollama" | "openai_compat") {
            return Err(ConfigError::ValidationError(format!(
                "unknown inference.backend '{}', expected 'ollama' or 'openai_compat'",
                self.inference.backend
            )));
        }

        if self.store.connect_timeout_secs == 0
            || self.store.op_timeout_secs == 0
            || self.inference.timeout_secs == 0
            || self.context.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Retention rules for the session store.
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy::new(
            Duration::from_secs(self.session.ttl_secs),
            self.session.max_history_messages,
        )
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value '{value}'")))
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
