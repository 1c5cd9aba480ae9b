//! Provider batch job snapshot.
//!
//! A batch job is owned by the inference provider. The backend only
//! submits, polls and reads it; these types mirror the provider's view.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Processing status reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Requests are still being processed
    #[default]
    InProgress,
    /// Cancellation was requested, in-flight requests are draining
    Canceling,
    /// All requests finished; results are available
    Ended,
    /// A status this client does not know about
    #[serde(other)]
    Unknown,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::InProgress => "in_progress",
            ProcessingStatus::Canceling => "canceling",
            ProcessingStatus::Ended => "ended",
            ProcessingStatus::Unknown => "unknown",
        }
    }

    /// Check if this is a terminal state (results can be read).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Ended)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate request counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestCounts {
    #[serde(default)]
    pub processing: u32,
    #[serde(default)]
    pub succeeded: u32,
    #[serde(default)]
    pub errored: u32,
    #[serde(default)]
    pub canceled: u32,
    #[serde(default)]
    pub expired: u32,
}

impl RequestCounts {
    pub fn total(&self) -> u32 {
        self.processing + self.succeeded + self.errored + self.canceled + self.expired
    }

    /// Requests that finished without a usable result.
    pub fn failed(&self) -> u32 {
        self.errored + self.canceled + self.expired
    }
}

/// Snapshot of a provider batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchJob {
    /// Opaque provider job ID
    pub id: String,

    pub processing_status: ProcessingStatus,

    #[serde(default)]
    pub request_counts: RequestCounts,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Location of the JSONL results once the job has ended
    #[serde(default)]
    pub results_url: Option<String>,
}

impl BatchJob {
    pub fn is_terminal(&self) -> bool {
        self.processing_status.is_terminal()
    }
}
