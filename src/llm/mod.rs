//! LLM integration for jobtrack.
//!
//! Both classifiers talk to an `LlmProvider`. The production backend is the
//! OpenAI Responses API over `reqwest`; tests substitute fixed-answer mocks.

pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig, http: reqwest::Client) -> Arc<dyn LlmProvider> {
    tracing::info!("Using OpenAI (model: {})", config.model);
    Arc::new(OpenAiProvider::new(
        http,
        config.api_key.clone(),
        config.model.clone(),
    ))
}
