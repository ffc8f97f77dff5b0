//! Completion model abstraction and the OpenRouter implementation.
//!
//! The query pipeline talks to the LLM only through [`CompletionModel`]:
//! one system prompt plus one user message in, one text reply out.
//! [`OpenRouterClient`] implements it against the OpenAI-compatible
//! `POST {base_url}/chat/completions` endpoint.
//!
//! Use [`OpenRouterClient::from_config`] at startup. It returns `None`
//! when the provider key is not configured, so callers can refuse
//! requests without ever touching the network.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::CompletionConfig;

/// One completion call: a system prompt and the user's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Ask the provider to reason before answering.
    pub reasoning: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            reasoning: false,
        }
    }

    pub fn with_reasoning(mut self, enabled: bool) -> Self {
        self.reasoning = enabled;
        self
    }
}

/// A text-completion service.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the model identifier (e.g. `"openai/gpt-oss-20b:free"`).
    fn model_name(&self) -> &str;

    /// Runs one completion and returns the reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

// ============ Wire types ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: Role,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct Reasoning {
    enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning>,
}

impl ChatRequest {
    fn from_completion(model: &str, request: CompletionRequest) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: request.system,
                },
                ChatMessage {
                    role: Role::User,
                    content: request.user,
                },
            ],
            reasoning: request.reasoning.then_some(Reasoning { enabled: true }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts the first choice's content from a chat completion response.
fn first_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("No response from OpenRouter"))
}

// ============ OpenRouter ============

/// Chat-completions client for OpenRouter (or any OpenAI-compatible API).
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
    app_name: Option<String>,
    site_url: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, config: &CompletionConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            http: builder.build()?,
            app_name: config.app_name.clone(),
            site_url: config.site_url.clone(),
        })
    }

    /// Builds a client when the provider key is configured.
    pub fn from_config(config: &CompletionConfig) -> Result<Option<Self>> {
        match config.api_key() {
            Some(key) => Ok(Some(Self::new(&key, config)?)),
            None => Ok(None),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref url) = self.site_url {
            if let Ok(val) = HeaderValue::from_str(url) {
                headers.insert("HTTP-Referer", val);
            }
        }

        if let Some(ref name) = self.app_name {
            if let Ok(val) = HeaderValue::from_str(name) {
                headers.insert("X-Title", val);
            }
        }

        Ok(headers)
    }
}

#[async_trait]
impl CompletionModel for OpenRouterClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::from_completion(&self.model, request);

        debug!(model = %body.model, reasoning = body.reasoning.is_some(), "chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenRouter API error ({}): {}", status, error_text));
        }

        let chat: ChatResponse = response.json().await?;
        first_content(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape_without_reasoning() {
        let req = ChatRequest::from_completion("m", CompletionRequest::new("sys", "hi"));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("reasoning").is_none());
    }

    #[test]
    fn test_request_shape_with_reasoning() {
        let req = ChatRequest::from_completion(
            "m",
            CompletionRequest::new("sys", "hi").with_reasoning(true),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["reasoning"]["enabled"], true);
    }

    #[test]
    fn test_first_content() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Казань"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), "Казань");
    }

    #[test]
    fn test_first_content_missing() {
        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_content(empty).is_err());

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(first_content(null).is_err());
    }

    #[test]
    fn test_from_config_without_key() {
        let cfg = CompletionConfig {
            api_key_env: "NKO_TEST_PROVIDER_KEY_UNSET".into(),
            ..CompletionConfig::default()
        };
        assert!(OpenRouterClient::from_config(&cfg).unwrap().is_none());
    }
}
