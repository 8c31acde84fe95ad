pub mod elevenlabs;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use crate::error::RelayError;
use super::ProviderConfig;
use self::elevenlabs::ElevenLabsSpeechClient;

/// Voice settings sent with every synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeechOptions {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self { stability: 0.5, similarity_boost: 0.5 }
    }
}

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Returns the encoded audio bytes for `text` spoken by `voice_id`.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        options: &SpeechOptions
    ) -> Result<Vec<u8>, RelayError>;

    fn provider(&self) -> &'static str;

    fn is_configured(&self) -> bool;
}

pub fn new_client(
    config: &ProviderConfig,
    model_id: &str
) -> Result<Arc<dyn SpeechClient>, RelayError> {
    let client = ElevenLabsSpeechClient::from_config(config, model_id)?;
    Ok(Arc::new(client))
}
