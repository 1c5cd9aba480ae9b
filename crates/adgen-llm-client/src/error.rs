//! LLM client error types.

use serde::Deserialize;
use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider returned {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Provider error envelope: `{"type": "error", "error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl LlmError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP response to an error.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (envelope.error.kind, envelope.error.message),
            Err(_) => ("unknown".to_string(), body.to_string()),
        };

        match status {
            404 => Self::NotFound(message),
            429 => Self::RateLimited(message),
            _ => Self::Api {
                status,
                kind,
                message,
            },
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::RateLimited(_) => Some(429),
            LlmError::NotFound(_) => Some(404),
            LlmError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is transient.
    ///
    /// The client never retries on its own; callers decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::RateLimited(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_parses_envelope() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"requests: too many"}}"#;
        match LlmError::from_http_status(400, body) {
            LlmError::Api { status, kind, message } => {
                assert_eq!(status, 400);
                assert_eq!(kind, "invalid_request_error");
                assert_eq!(message, "requests: too many");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_http_status_classification() {
        assert!(matches!(LlmError::from_http_status(404, "{}"), LlmError::NotFound(_)));
        assert!(LlmError::from_http_status(429, "slow down").is_retryable());
        assert!(LlmError::from_http_status(529, "overloaded").is_retryable());
        assert!(!LlmError::from_http_status(401, "bad key").is_retryable());
        assert_eq!(LlmError::from_http_status(503, "").http_status(), Some(503));
    }
}
