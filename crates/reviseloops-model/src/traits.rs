use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::{Bindings, ChatPrompt, ChatRequest};

/// Errors that can occur while invoking a model provider
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Request to {provider} failed: {message}")]
    Request { provider: Provider, message: String },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {provider} response: {message}")]
    Decode { provider: Provider, message: String },

    #[error("{0} returned no content")]
    EmptyResponse(Provider),

    #[error("Prompt template references unbound placeholder: {0}")]
    MissingBinding(String),

    #[error("Model configuration error: {0}")]
    Config(String),
}

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Environment variable holding the provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Settings for one model role (agent, reviser or evaluator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSettings {
    pub provider: Provider,
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Override the provider endpoint (proxies, compatible servers)
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    120
}

impl ModelSettings {
    pub fn new(provider: Provider, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            base_url: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The capability every provider adapter offers: turn a prompt into text
#[async_trait]
pub trait Model: Send + Sync {
    /// Human-readable name, used in logs
    fn name(&self) -> &str;

    /// Send an already rendered request and return the response text
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError>;

    /// Render `prompt` with `bindings` and send it
    async fn invoke(&self, prompt: &ChatPrompt, bindings: &Bindings) -> Result<String, ModelError> {
        let request = prompt.render(bindings)?;
        self.complete(&request).await
    }
}
