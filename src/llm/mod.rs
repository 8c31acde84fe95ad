pub mod chat;
pub mod speech;

use crate::error::RelayError;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::Client as HttpClient;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Url,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self, RelayError> {
        let base_url = Url::parse(base_url).map_err(|e|
            RelayError::Config(format!("Invalid provider base URL '{}': {}", base_url, e))
        )?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::Config(format!("Provider URL '{}' cannot be a base URL", base_url)));
        }
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Ok(Self { api_key, base_url, timeout })
    }
}

/// Appends `segments` to `base`, percent-encoding each one as a single path segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, RelayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RelayError::Config(format!("Provider URL '{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn build_http_client(
    provider: &'static str,
    headers: HeaderMap,
    timeout: Duration
) -> Result<HttpClient, RelayError> {
    HttpClient::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| RelayError::Config(format!("Failed to build {} HTTP client: {}", provider, e)))
}

/// Turns a non-2xx upstream response into a `Provider` error carrying status and payload.
pub(crate) async fn provider_status_error(
    provider: &'static str,
    response: reqwest::Response
) -> RelayError {
    let status = response.status();
    let body = match response.text().await {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!("Failed to read {} error body: {}", provider, e);
            None
        }
    };
    RelayError::Provider {
        provider,
        status: Some(status.as_u16()),
        body,
        message: format!("upstream returned {}", status),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_each_segment() {
        let base = Url::parse("https://api.elevenlabs.io").unwrap();
        let url = endpoint(&base, &["v1", "text-to-speech", "voice/../x y"]).unwrap();
        assert_eq!(url.as_str(), "https://api.elevenlabs.io/v1/text-to-speech/voice%2F..%2Fx%20y");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("http://proxy.local/anthropic/").unwrap();
        let url = endpoint(&base, &["v1", "messages"]).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/anthropic/v1/messages");
    }

    #[test]
    fn provider_config_rejects_invalid_url_and_blank_key() {
        assert!(matches!(
            ProviderConfig::new(None, "not a url", Duration::from_secs(1)),
            Err(RelayError::Config(_))
        ));
        let config = ProviderConfig::new(
            Some("  ".to_string()),
            "https://api.anthropic.com",
            Duration::from_secs(1)
        ).unwrap();
        assert!(config.api_key.is_none());
    }
}
