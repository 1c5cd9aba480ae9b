//! Provider traits.
//!
//! The workflow depends on these traits rather than on [`AnthropicClient`]
//! so a caller-constructed client is injected wherever it is used.
//!
//! [`AnthropicClient`]: crate::AnthropicClient

use adgen_models::BatchJob;
use async_trait::async_trait;

use crate::error::LlmResult;
use crate::types::{BatchResultLine, GenerationRequest, Message, MessageRequest};

/// Asynchronous bulk inference.
#[async_trait]
pub trait BatchProvider: Send + Sync {
    /// Submit all requests as one batch job. Either the whole batch is
    /// accepted or an error is returned and nothing is created.
    async fn create_batch(&self, requests: &[GenerationRequest]) -> LlmResult<BatchJob>;

    /// Read the current state of a batch job. Never mutates the job.
    async fn retrieve_batch(&self, batch_id: &str) -> LlmResult<BatchJob>;

    /// Read every result line of an ended batch job.
    async fn batch_results(&self, batch_id: &str) -> LlmResult<Vec<BatchResultLine>>;
}

/// Synchronous single-message inference.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    async fn create_message(&self, request: &MessageRequest) -> LlmResult<Message>;
}
