//! Generated hook/script results and per-item provider errors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::request_key::{HookKey, ScriptKey};

/// Token usage reported for one generated message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Text plus usage, as persisted on the campaign record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedText {
    pub text: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

/// A succeeded hook generation.
///
/// This is the value passed from the hook stage to the script stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HookResult {
    pub key: HookKey,
    pub text: String,
    pub usage: TokenUsage,
}

impl HookResult {
    pub fn to_generated(&self) -> GeneratedText {
        GeneratedText {
            text: self.text.clone(),
            usage: self.usage,
        }
    }
}

/// A succeeded script generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptResult {
    pub key: ScriptKey,
    pub text: String,
    pub usage: TokenUsage,
}

impl ScriptResult {
    pub fn to_generated(&self) -> GeneratedText {
        GeneratedText {
            text: self.text.clone(),
            usage: self.usage,
        }
    }
}

/// Outcome class of a non-succeeded batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    Errored,
    Canceled,
    Expired,
}

/// A batch item the provider did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ItemError {
    pub custom_id: String,
    pub kind: ItemErrorKind,
    /// Vendor-supplied error detail
    pub detail: String,
}
