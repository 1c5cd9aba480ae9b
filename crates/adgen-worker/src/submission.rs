//! Atomic batch submission shared by both generation stages.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adgen_llm_client::{BatchProvider, GenerationRequest};
use adgen_models::{AvatarAnalysis, Campaign, CampaignId, ProductInfo};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::{events, WorkflowLogger};
use crate::metrics::record_submission;

/// Generation stage a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Hooks,
    Scripts,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Hooks => "hooks",
            Stage::Scripts => "scripts",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch the provider accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedBatch {
    pub batch_id: String,
    pub stage: Stage,
    pub campaign_id: CampaignId,
    pub request_count: usize,
    pub submitted_at: DateTime<Utc>,
}

impl SubmittedBatch {
    /// A batch submitted by an earlier run, known only by its id.
    ///
    /// `request_count` is 0 because the original count was not stored.
    pub fn resumed(batch_id: &str, stage: Stage, campaign_id: &CampaignId) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            stage,
            campaign_id: campaign_id.clone(),
            request_count: 0,
            submitted_at: Utc::now(),
        }
    }
}

/// Campaign research every generation request is rendered from.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub campaign_id: CampaignId,
    pub product: ProductInfo,
    pub avatar: Option<AvatarAnalysis>,
}

impl GenerationContext {
    pub fn new(campaign_id: CampaignId, product: ProductInfo, avatar: Option<AvatarAnalysis>) -> Self {
        Self {
            campaign_id,
            product,
            avatar,
        }
    }

    /// Build from a stored campaign. The product analysis must exist.
    pub fn from_campaign(campaign: &Campaign) -> WorkerResult<Self> {
        let product = campaign.product_info.clone().ok_or_else(|| {
            WorkerError::validation(format!("campaign {} has no product information", campaign.id))
        })?;

        Ok(Self::new(
            campaign.id.clone(),
            product,
            campaign.avatar_analysis.clone(),
        ))
    }
}

/// Submit all requests as one batch.
///
/// Request ids must be unique; a duplicate is rejected before anything is
/// sent. A provider rejection leaves no batch behind and is returned with
/// the campaign and request count attached.
pub async fn submit_batch(
    provider: &dyn BatchProvider,
    campaign_id: &CampaignId,
    stage: Stage,
    requests: &[GenerationRequest],
) -> WorkerResult<SubmittedBatch> {
    let logger = WorkflowLogger::new(campaign_id, stage.as_str());

    let mut seen = HashSet::with_capacity(requests.len());
    if let Some(dup) = requests.iter().find(|r| !seen.insert(r.custom_id.as_str())) {
        return Err(WorkerError::validation(format!(
            "duplicate request id '{}' in {} batch",
            dup.custom_id, stage
        )));
    }

    match provider.create_batch(requests).await {
        Ok(job) => {
            record_submission(stage, requests.len(), true);
            logger.info(
                events::BATCH_SUBMITTED,
                &format!("Submitted batch {} with {} requests", job.id, requests.len()),
            );

            Ok(SubmittedBatch {
                batch_id: job.id,
                stage,
                campaign_id: campaign_id.clone(),
                request_count: requests.len(),
                submitted_at: job.created_at,
            })
        }
        Err(source) => {
            record_submission(stage, requests.len(), false);
            logger.error(
                events::BATCH_SUBMIT_FAILED,
                &format!("Batch of {} requests rejected: {}", requests.len(), source),
            );

            Err(WorkerError::Submission {
                campaign_id: campaign_id.to_string(),
                stage: stage.as_str(),
                request_count: requests.len(),
                source,
            })
        }
    }
}
