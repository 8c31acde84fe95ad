use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ ChatClient, CompletionOptions };
use crate::error::RelayError;
use crate::llm::{ build_http_client, endpoint, provider_status_error, ProviderConfig };
use crate::models::chat::ChatMessage;

pub const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicChatClient {
    http: HttpClient,
    url: Url,
    configured: bool,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl AnthropicChatClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key).map_err(|e|
                RelayError::Config(format!("Invalid Anthropic API key format: {}", e))
            )?;
            value.set_sensitive(true);
            headers.insert("x-api-key", value);
        }

        Ok(Self {
            http: build_http_client(PROVIDER, headers, config.timeout)?,
            url: endpoint(&config.base_url, &["v1", "messages"])?,
            configured: config.api_key.is_some(),
        })
    }
}

fn first_text_block(response: MessagesResponse) -> Result<String, RelayError> {
    let block = response.content
        .into_iter()
        .next()
        .ok_or_else(|| RelayError::malformed(PROVIDER, "response has no content blocks"))?;
    block.text.ok_or_else(||
        RelayError::malformed(
            PROVIDER,
            format!("first content block is of type '{}' and carries no text", block.kind)
        )
    )
}

#[async_trait]
impl ChatClient for AnthropicChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<String, RelayError> {
        if !self.configured {
            return Err(RelayError::Config("Anthropic API key is not configured".to_string()));
        }

        let request = MessagesRequest {
            model: &options.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system: system_prompt,
            messages: history,
        };
        debug!(
            "Sending {} messages to {} (model={}, system prompt {} chars)",
            history.len(),
            self.url,
            options.model,
            system_prompt.len()
        );

        let response = self.http
            .post(self.url.clone())
            .json(&request)
            .send().await
            .map_err(|e| RelayError::provider(PROVIDER, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(provider_status_error(PROVIDER, response).await);
        }

        let body = response
            .bytes().await
            .map_err(|e| RelayError::provider(PROVIDER, format!("failed to read body: {}", e)))?;
        let parsed: MessagesResponse = serde_json
            ::from_slice(&body)
            .map_err(|e| RelayError::malformed(PROVIDER, format!("invalid JSON body: {}", e)))?;

        let text = first_text_block(parsed)?;
        debug!("Anthropic reply received ({} chars)", text.len());
        Ok(text)
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
