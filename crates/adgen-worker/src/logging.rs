//! Structured workflow logging.
//!
//! Every submission, status check and retrieval emits an event with a
//! stable `event` tag, a readable message and the campaign it belongs to.

use tracing::{error, info, warn, Span};

use adgen_models::CampaignId;

/// Event tags.
pub mod events {
    pub const ANGLES_GENERATED: &str = "angles_generated";
    pub const BATCH_SUBMITTED: &str = "batch_submitted";
    pub const BATCH_SUBMIT_FAILED: &str = "batch_submit_failed";
    pub const STATUS_CHECKED: &str = "batch_status_checked";
    pub const STATUS_CHECK_FAILED: &str = "batch_status_check_failed";
    pub const RESULTS_RETRIEVED: &str = "batch_results_retrieved";
    pub const RETRIEVAL_FAILED: &str = "batch_retrieval_failed";
    pub const PREMATURE_RETRIEVAL: &str = "batch_premature_retrieval";
    pub const UNCLASSIFIED_RESULT: &str = "batch_unclassified_result";
    pub const MALFORMED_IDENTIFIER: &str = "malformed_identifier";
    pub const BATCH_STUCK: &str = "batch_stuck";
    pub const BATCH_FAILED: &str = "batch_failed";
    pub const ARCHIVE_FAILED: &str = "batch_archive_failed";
    pub const PIPELINE_STARTED: &str = "pipeline_started";
    pub const PIPELINE_COMPLETED: &str = "pipeline_completed";
}

/// Logger bound to one campaign and one workflow stage.
#[derive(Debug, Clone)]
pub struct WorkflowLogger {
    campaign_id: String,
    stage: String,
}

impl WorkflowLogger {
    pub fn new(campaign_id: &CampaignId, stage: &str) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Logger with no campaign context, for calls addressed by batch id only.
    pub fn detached(stage: &str) -> Self {
        Self {
            campaign_id: "-".to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn info(&self, event: &str, message: &str) {
        info!(
            campaign_id = %self.campaign_id,
            stage = %self.stage,
            event = event,
            "{}", message
        );
    }

    pub fn warn(&self, event: &str, message: &str) {
        warn!(
            campaign_id = %self.campaign_id,
            stage = %self.stage,
            event = event,
            "{}", message
        );
    }

    pub fn error(&self, event: &str, message: &str) {
        error!(
            campaign_id = %self.campaign_id,
            stage = %self.stage,
            event = event,
            "{}", message
        );
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "workflow",
            campaign_id = %self.campaign_id,
            stage = %self.stage
        )
    }
}
