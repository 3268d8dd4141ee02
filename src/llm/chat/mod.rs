pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned no completion")]
    EmptyResponse,
    #[error("{0} API key is required")]
    MissingApiKey(LlmType),
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
    #[error("completion timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Single-turn completion seeded with the human's message.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn CompletionClient>, ProviderError> {
    let client: Arc<dyn CompletionClient> = match config.llm_type {
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
