//! Supabase error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for Supabase operations.
pub type SupabaseResult<T> = Result<T, SupabaseError>;

/// Errors that can occur during Supabase operations.
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Row already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error {0}: {1}")]
    ServerError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SupabaseError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            401 | 403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            409 => Self::AlreadyExists(msg),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SupabaseError::PermissionDenied(_) => Some(403),
            SupabaseError::NotFound(_) => Some(404),
            SupabaseError::AlreadyExists(_) => Some(409),
            SupabaseError::RateLimited(_) => Some(429),
            SupabaseError::ServerError(status, _) => Some(*status),
            SupabaseError::RequestFailed(_) => Some(400),
            SupabaseError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-suggested wait before retrying.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SupabaseError::RateLimited(ms) => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    /// Transient failure of an idempotent call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SupabaseError::Network(_) | SupabaseError::RateLimited(_) | SupabaseError::ServerError(..)
        )
    }

    /// The request never reached the database.
    pub fn is_unsent(&self) -> bool {
        match self {
            SupabaseError::RateLimited(_) => true,
            SupabaseError::Network(e) => e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_http_status() {
        assert!(matches!(
            SupabaseError::from_http_status(401, "bad key"),
            SupabaseError::PermissionDenied(_)
        ));
        assert!(matches!(
            SupabaseError::from_http_status(409, "duplicate"),
            SupabaseError::AlreadyExists(_)
        ));
        assert!(matches!(
            SupabaseError::from_http_status(400, "bad filter"),
            SupabaseError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SupabaseError::from_http_status(429, "").is_retryable());
        assert!(SupabaseError::from_http_status(503, "").is_retryable());
        assert!(!SupabaseError::from_http_status(404, "").is_retryable());
        assert!(!SupabaseError::config_error("missing").is_retryable());
    }

    #[test]
    fn test_unsent_classification() {
        assert!(SupabaseError::RateLimited(1000).is_unsent());
        assert!(!SupabaseError::ServerError(500, "timeout".into()).is_unsent());
        assert!(!SupabaseError::not_found("campaigns").is_unsent());
    }

    #[test]
    fn test_http_status_getter() {
        assert_eq!(SupabaseError::RateLimited(1000).http_status(), Some(429));
        assert_eq!(
            SupabaseError::ServerError(502, "bad gateway".into()).http_status(),
            Some(502)
        );
        assert_eq!(
            SupabaseError::RateLimited(250).retry_after(),
            Some(Duration::from_millis(250))
        );
    }
}
