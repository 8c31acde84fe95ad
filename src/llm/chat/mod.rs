pub mod anthropic;

use async_trait::async_trait;
use std::sync::Arc;
use crate::error::RelayError;
use crate::models::chat::ChatMessage;
use super::ProviderConfig;
use self::anthropic::AnthropicChatClient;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the full history with `system_prompt` and returns the reply text.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<String, RelayError>;

    fn provider(&self) -> &'static str;

    fn is_configured(&self) -> bool;
}

pub fn new_client(config: &ProviderConfig) -> Result<Arc<dyn ChatClient>, RelayError> {
    let client = AnthropicChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
