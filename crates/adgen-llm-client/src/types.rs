//! Anthropic request/response types.

use adgen_models::{ItemErrorKind, TokenUsage};
use serde::{Deserialize, Serialize};

/// Model tier. Each generation stage is pinned to one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Cheap and fast; used for angles and hooks
    Fast,
    /// Higher output fidelity; used for scripts
    Quality,
}

impl ModelTier {
    pub fn model(&self) -> &'static str {
        match self {
            ModelTier::Fast => "claude-3-5-haiku-20241022",
            ModelTier::Quality => "claude-3-5-sonnet-20241022",
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            ModelTier::Fast => 1024,
            ModelTier::Quality => 4096,
        }
    }
}

/// A single-turn message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl MessageRequest {
    /// Build a user-turn request with the tier's model and output bound.
    pub fn for_tier(tier: ModelTier, prompt: impl Into<String>) -> Self {
        Self {
            model: tier.model().to_string(),
            max_tokens: tier.max_tokens(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
        }
    }

    /// The user prompt of the first turn.
    pub fn prompt(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// One entry of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    /// Wire identifier, echoed back on the result line
    pub custom_id: String,
    pub params: MessageRequest,
}

impl GenerationRequest {
    pub fn new(custom_id: impl Into<String>, params: MessageRequest) -> Self {
        Self {
            custom_id: custom_id.into(),
            params,
        }
    }
}

/// Body of `POST /v1/messages/batches`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateBatchBody<'a> {
    pub requests: &'a [GenerationRequest],
}

/// A content block of a generated message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A generated message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Message {
    /// Text of the first content block, if it is a text block.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Outcome of a single batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchItemResult {
    Succeeded { message: Message },
    Errored { error: serde_json::Value },
    Canceled,
    Expired,
    /// A result type this client does not know
    #[serde(other)]
    Unknown,
}

impl BatchItemResult {
    /// Error class for non-succeeded outcomes.
    pub fn error_kind(&self) -> Option<ItemErrorKind> {
        match self {
            BatchItemResult::Succeeded { .. } => None,
            BatchItemResult::Errored { .. } => Some(ItemErrorKind::Errored),
            BatchItemResult::Canceled => Some(ItemErrorKind::Canceled),
            BatchItemResult::Expired => Some(ItemErrorKind::Expired),
            BatchItemResult::Unknown => Some(ItemErrorKind::Errored),
        }
    }

    /// Human-readable error detail for non-succeeded outcomes.
    pub fn error_detail(&self) -> Option<String> {
        match self {
            BatchItemResult::Succeeded { .. } => None,
            BatchItemResult::Errored { error } => Some(describe_error(error)),
            BatchItemResult::Canceled => Some("request canceled before processing".to_string()),
            BatchItemResult::Expired => Some("batch expired before request was processed".to_string()),
            BatchItemResult::Unknown => Some("unrecognized result type".to_string()),
        }
    }
}

/// Pull `type: message` out of the nested provider error object.
fn describe_error(error: &serde_json::Value) -> String {
    let inner = error.get("error").unwrap_or(error);
    let kind = inner.get("type").and_then(|v| v.as_str());
    let message = inner.get("message").and_then(|v| v.as_str());

    match (kind, message) {
        (Some(kind), Some(message)) => format!("{}: {}", kind, message),
        (None, Some(message)) => message.to_string(),
        _ => error.to_string(),
    }
}

/// One line of the batch results JSONL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultLine {
    pub custom_id: String,
    pub result: BatchItemResult,
}
