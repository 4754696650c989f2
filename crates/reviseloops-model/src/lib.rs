//! # reviseloops-model
//!
//! Model abstraction for the reviseloops revision system.
//!
//! Every stage of the loop (evaluation, feedback, revision) talks to a
//! language model through the single [`Model`] capability: render a
//! [`ChatPrompt`] with [`Bindings`] and get text back. Provider adapters
//! implement it; nothing above this crate branches on provider identity.
//!
//! ## Key Types
//!
//! - [`Model`] - The invocation trait
//! - [`ChatPrompt`] / [`Bindings`] - `{name}` templates and their values
//! - [`OpenAiModel`] / [`AnthropicModel`] - HTTP adapters
//! - [`ScriptedModel`] - Offline model answering from a script

mod anthropic;
mod openai;
mod prompt;
mod scripted;
mod traits;

use std::sync::Arc;

pub use anthropic::AnthropicModel;
pub use openai::OpenAiModel;
pub use prompt::{render_template, Bindings, ChatPrompt, ChatRequest};
pub use scripted::ScriptedModel;
pub use traits::{Model, ModelError, ModelSettings, Provider};

/// Create a model adapter for the configured provider
pub fn create_model(settings: &ModelSettings, api_key: impl Into<String>) -> Arc<dyn Model> {
    match settings.provider {
        Provider::OpenAi => Arc::new(OpenAiModel::from_settings(settings, api_key)),
        Provider::Anthropic => Arc::new(AnthropicModel::from_settings(settings, api_key)),
    }
}

/// Create a model adapter, reading the API key from the provider's
/// environment variable
pub fn create_model_from_env(settings: &ModelSettings) -> Result<Arc<dyn Model>, ModelError> {
    let var = settings.provider.api_key_env();
    let api_key = std::env::var(var)
        .map_err(|_| ModelError::Config(format!("{} environment variable not set", var)))?;
    Ok(create_model(settings, api_key))
}
