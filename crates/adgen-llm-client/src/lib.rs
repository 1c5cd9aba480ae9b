//! Client for the Anthropic Messages and Message Batches APIs.
//!
//! This crate provides:
//! - Batch submission, status lookup and JSONL result streaming
//! - Synchronous message creation
//! - `BatchProvider` / `MessageProvider` traits so callers can inject a fake
//! - Fixed model tiers for the fast (hook) and quality (script) stages

pub mod client;
pub mod error;
pub mod jsonl;
pub mod provider;
pub mod types;

pub use client::{AnthropicClient, AnthropicConfig};
pub use error::{LlmError, LlmResult};
pub use provider::{BatchProvider, MessageProvider};
pub use types::{
    BatchItemResult, BatchResultLine, ContentBlock, GenerationRequest, Message, MessageRequest,
    ModelTier,
};
