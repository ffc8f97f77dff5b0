//! TOML configuration parsing and validation.
//!
//! Every section is optional; a missing config file yields
//! [`Config::minimal`]. Secrets never live in the file: the provider key is
//! read from the environment variable named by `completion.api_key_env`.
//!
//! ```toml
//! [backend]
//! url = "http://backend:8000"
//! timeout_secs = 30
//!
//! [completion]
//! model = "openai/gpt-oss-20b:free"
//! reasoning = true
//!
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [query]
//! max_context_records = 5
//! ```
//!
//! `BACKEND_URL`, when set, overrides `backend.url`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use nko_assistant_core::models::DEFAULT_CONTEXT_RECORDS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_backend_url() -> String {
    "http://backend:8000".to_string()
}
fn default_backend_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the provider key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout; unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Ask the provider for reasoning on the composition call.
    #[serde(default = "default_reasoning")]
    pub reasoning: bool,
    /// Sent as `X-Title` for OpenRouter app attribution.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution.
    #[serde(default)]
    pub site_url: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: None,
            reasoning: default_reasoning(),
            app_name: None,
            site_url: None,
        }
    }
}

fn default_completion_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_model() -> String {
    "openai/gpt-oss-20b:free".to_string()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}
fn default_reasoning() -> bool {
    true
}

impl CompletionConfig {
    /// Provider key from the environment; blank values count as absent.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// Cap on records handed to the composer.
    #[serde(default = "default_max_context_records")]
    pub max_context_records: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_context_records: default_max_context_records(),
        }
    }
}

fn default_max_context_records() -> usize {
    DEFAULT_CONTEXT_RECORDS
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Loads the config file, or the defaults when `path` does not exist,
/// then applies environment overrides and validates.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        Config::minimal()
    };

    if let Ok(url) = std::env::var("BACKEND_URL") {
        if !url.trim().is_empty() {
            config.backend.url = url;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let url = config.backend.url.trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("backend.url must start with http:// or https://, got '{}'", url);
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }
    if config.completion.model.trim().is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }
    if config.completion.api_key_env.trim().is_empty() {
        anyhow::bail!("completion.api_key_env must not be empty");
    }
    if config.completion.timeout_secs == Some(0) {
        anyhow::bail!("completion.timeout_secs must be > 0 when set");
    }
    if !(1..=DEFAULT_CONTEXT_RECORDS).contains(&config.query.max_context_records) {
        anyhow::bail!(
            "query.max_context_records must be between 1 and {}, got {}",
            DEFAULT_CONTEXT_RECORDS,
            config.query.max_context_records
        );
    }
    Ok(())
}
