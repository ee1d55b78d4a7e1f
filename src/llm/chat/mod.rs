pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, ReasoningEffort };
use self::openai::OpenAIResponsesClient;
use crate::models::ChatMessage;

/// Message used when the provider fails without saying why.
pub const GENERIC_PROVIDER_ERROR: &str = "Upstream completion request failed";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
    },
    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
}

impl ProviderError {
    /// Text passed through to the relay caller.
    pub fn public_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() { GENERIC_PROVIDER_ERROR.to_string() } else { msg }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub effort: ReasoningEffort,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One call to the provider; an absent generated text comes back as `""`.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Builds the shared provider handle. `None` when no credential is configured.
pub fn new_provider(
    config: &LlmConfig
) -> Result<Option<Arc<dyn CompletionProvider>>, ProviderError> {
    if config.credential().is_none() {
        return Ok(None);
    }
    let client: Arc<dyn CompletionProvider> = Arc::new(OpenAIResponsesClient::from_config(config)?);
    Ok(Some(client))
}
