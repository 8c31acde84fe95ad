use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE } };
use serde::Serialize;
use url::Url;

use super::{ SpeechClient, SpeechOptions };
use crate::error::RelayError;
use crate::llm::{ build_http_client, endpoint, provider_status_error, ProviderConfig };

pub const PROVIDER: &str = "elevenlabs";

pub struct ElevenLabsSpeechClient {
    http: HttpClient,
    base_url: Url,
    model_id: String,
    configured: bool,
}

#[derive(Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a SpeechOptions,
}

impl ElevenLabsSpeechClient {
    pub fn from_config(config: &ProviderConfig, model_id: &str) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("audio/mpeg"));
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key).map_err(|e|
                RelayError::Config(format!("Invalid ElevenLabs API key format: {}", e))
            )?;
            value.set_sensitive(true);
            headers.insert("xi-api-key", value);
        }

        Ok(Self {
            http: build_http_client(PROVIDER, headers, config.timeout)?,
            base_url: config.base_url.clone(),
            model_id: model_id.to_string(),
            configured: config.api_key.is_some(),
        })
    }
}

#[async_trait]
impl SpeechClient for ElevenLabsSpeechClient {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        options: &SpeechOptions
    ) -> Result<Vec<u8>, RelayError> {
        if !self.configured {
            return Err(RelayError::Config("ElevenLabs API key is not configured".to_string()));
        }
        if voice_id.trim().is_empty() {
            return Err(RelayError::Config("Voice id is empty".to_string()));
        }

        let url = endpoint(&self.base_url, &["v1", "text-to-speech", voice_id])?;
        let request = TextToSpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: options,
        };
        debug!("Requesting speech for {} chars from {}", text.len(), url);

        let response = self.http
            .post(url)
            .json(&request)
            .send().await
            .map_err(|e| RelayError::provider(PROVIDER, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(provider_status_error(PROVIDER, response).await);
        }

        let audio = response
            .bytes().await
            .map_err(|e| RelayError::provider(PROVIDER, format!("failed to read audio: {}", e)))?;
        if audio.is_empty() {
            return Err(RelayError::malformed(PROVIDER, "response contained no audio"));
        }

        debug!("Received {} bytes of audio from ElevenLabs", audio.len());
        Ok(audio.to_vec())
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
