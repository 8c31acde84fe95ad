use thiserror::Error;

/// Failures raised while running a turn or a standalone synthesis.
///
/// Only `Validation` carries a message meant for the client; every other variant is
/// logged in full and surfaced as a generic failure.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{provider} request failed{}: {message}", status_suffix(.status))]
    Provider {
        provider: &'static str,
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },

    #[error("{provider} returned an unexpected response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

impl RelayError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        RelayError::Provider {
            provider,
            status: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn malformed(provider: &'static str, message: impl Into<String>) -> Self {
        RelayError::MalformedResponse {
            provider,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RelayError::Validation(_))
    }

    /// Upstream payload captured for server-side logs, if any.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            RelayError::Provider { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_includes_status_but_not_body() {
        let err = RelayError::Provider {
            provider: "anthropic",
            status: Some(529),
            body: Some("{\"type\":\"overloaded_error\"}".to_string()),
            message: "upstream returned an error".to_string(),
        };

        let rendered = err.to_string();
        assert!(rendered.contains("529"));
        assert!(!rendered.contains("overloaded_error"));
        assert_eq!(err.upstream_body(), Some("{\"type\":\"overloaded_error\"}"));
    }

    #[test]
    fn network_failure_has_no_status() {
        let err = RelayError::provider("elevenlabs", "connection refused");
        assert_eq!(err.to_string(), "elevenlabs request failed: connection refused");
        assert!(!err.is_validation());
    }
}
