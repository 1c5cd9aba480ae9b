//! Shared data models for the AdGen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Campaigns and workflow steps
//! - Marketing angles, product info and avatar analysis
//! - Structured hook/script request keys and their wire format
//! - Provider batch job snapshots
//! - Generated results and per-item errors

pub mod angle;
pub mod batch;
pub mod campaign;
pub mod generation;
pub mod product;
pub mod request_key;
pub mod utils;

// Re-export common types
pub use angle::{Angle, Polarity};
pub use batch::{BatchJob, ProcessingStatus, RequestCounts};
pub use campaign::{Campaign, CampaignId, WorkflowStep};
pub use generation::{GeneratedText, HookResult, ItemError, ItemErrorKind, ScriptResult, TokenUsage};
pub use product::{AvatarAnalysis, ProductInfo};
pub use request_key::{
    HookKey, KeyError, RequestKey, ScriptKey, ScriptVariant, HOOKS_PER_ANGLE, SCRIPTS_PER_HOOK,
};
