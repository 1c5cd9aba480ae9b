//! Worker error types.

use adgen_models::{KeyError, ProcessingStatus};
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Batch submission of {request_count} {stage} requests for campaign {campaign_id} failed: {source}")]
    Submission {
        campaign_id: String,
        stage: &'static str,
        request_count: usize,
        #[source]
        source: adgen_llm_client::LlmError,
    },

    #[error("Status check of batch {batch_id} failed: {source}")]
    StatusCheck {
        batch_id: String,
        #[source]
        source: adgen_llm_client::LlmError,
    },

    #[error("Results of batch {batch_id} requested while it is still {status}")]
    PrematureRetrieval {
        batch_id: String,
        status: ProcessingStatus,
    },

    #[error("Reading results of batch {batch_id} failed: {source}")]
    Retrieval {
        batch_id: String,
        #[source]
        source: adgen_llm_client::LlmError,
    },

    #[error(transparent)]
    MalformedIdentifier(#[from] KeyError),

    #[error("Batch {batch_id} did not end within {waited_secs}s")]
    BatchStuck { batch_id: String, waited_secs: u64 },

    #[error("AI generation failed: {0}")]
    AiFailed(String),

    #[error("LLM error: {0}")]
    Llm(#[from] adgen_llm_client::LlmError),

    #[error("Database error: {0}")]
    Supabase(#[from] adgen_supabase::SupabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] adgen_storage::StorageError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    /// Batch id this error refers to, if any.
    pub fn batch_id(&self) -> Option<&str> {
        match self {
            Self::StatusCheck { batch_id, .. }
            | Self::PrematureRetrieval { batch_id, .. }
            | Self::Retrieval { batch_id, .. }
            | Self::BatchStuck { batch_id, .. } => Some(batch_id),
            _ => None,
        }
    }

    /// Check if error is retryable by the caller.
    ///
    /// The workflow itself never retries; this only classifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Submission { source, .. }
            | Self::StatusCheck { source, .. }
            | Self::Retrieval { source, .. } => source.is_retryable(),
            Self::PrematureRetrieval { .. } => true,
            Self::Llm(e) => e.is_retryable(),
            Self::Supabase(e) => e.is_retryable(),
            Self::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgen_llm_client::LlmError;

    #[test]
    fn test_premature_retrieval_names_status() {
        let err = WorkerError::PrematureRetrieval {
            batch_id: "batch_abc".to_string(),
            status: ProcessingStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "Results of batch batch_abc requested while it is still in_progress"
        );
        assert_eq!(err.batch_id(), Some("batch_abc"));
    }

    #[test]
    fn test_submission_error_carries_context() {
        let err = WorkerError::Submission {
            campaign_id: "c-1".to_string(),
            stage: "hooks",
            request_count: 42,
            source: LlmError::RateLimited("slow down".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("42 hooks requests"));
        assert!(msg.contains("campaign c-1"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_malformed_identifier_is_permanent() {
        let key_err = "hook_angleX_hook1".parse::<adgen_models::HookKey>().unwrap_err();
        let err = WorkerError::from(key_err);
        assert!(matches!(err, WorkerError::MalformedIdentifier(_)));
        assert!(!err.is_retryable());
    }
}
