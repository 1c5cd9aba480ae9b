//! Archived batch results.
//!
//! Every retrieved batch is written once, as JSON, under
//! `campaigns/{campaign_id}/batches/{batch_id}/results.json`.

use adgen_models::{CampaignId, RequestCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::S3Client;
use crate::error::StorageResult;

/// Key prefix for all objects of a campaign.
pub fn campaign_prefix(campaign_id: &CampaignId) -> String {
    format!("campaigns/{}/", campaign_id)
}

/// Key of the archived results of one batch.
pub fn batch_results_key(campaign_id: &CampaignId, batch_id: &str) -> String {
    format!("{}batches/{}/results.json", campaign_prefix(campaign_id), batch_id)
}

/// Raw result lines of a batch together with where they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedBatch<T> {
    pub campaign_id: CampaignId,
    pub batch_id: String,
    /// `hooks` or `scripts`
    pub stage: String,
    pub request_counts: RequestCounts,
    pub archived_at: DateTime<Utc>,
    pub results: Vec<T>,
}

impl<T> ArchivedBatch<T> {
    pub fn new(
        campaign_id: CampaignId,
        batch_id: impl Into<String>,
        stage: impl Into<String>,
        request_counts: RequestCounts,
        results: Vec<T>,
    ) -> Self {
        Self {
            campaign_id,
            batch_id: batch_id.into(),
            stage: stage.into(),
            request_counts,
            archived_at: Utc::now(),
            results,
        }
    }

    pub fn key(&self) -> String {
        batch_results_key(&self.campaign_id, &self.batch_id)
    }
}

impl S3Client {
    /// Write an archived batch. Returns the object key.
    pub async fn archive_batch<T: Serialize>(&self, batch: &ArchivedBatch<T>) -> StorageResult<String> {
        let key = batch.key();
        self.put_json(&key, batch).await?;
        info!(
            campaign_id = %batch.campaign_id,
            batch_id = %batch.batch_id,
            stage = %batch.stage,
            results = batch.results.len(),
            "Archived batch results"
        );
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_results_key() {
        let campaign = CampaignId::from("c-42");
        assert_eq!(campaign_prefix(&campaign), "campaigns/c-42/");
        assert_eq!(
            batch_results_key(&campaign, "msgbatch_01"),
            "campaigns/c-42/batches/msgbatch_01/results.json"
        );
    }

    #[test]
    fn test_archived_batch_serializes_counts() {
        let batch = ArchivedBatch::new(
            CampaignId::from("c-1"),
            "b-1",
            "hooks",
            RequestCounts {
                succeeded: 2,
                errored: 1,
                ..Default::default()
            },
            vec![serde_json::json!({"custom_id": "hook_angle1_hook1"})],
        );

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["stage"], "hooks");
        assert_eq!(value["request_counts"]["succeeded"], 2);
        assert_eq!(value["results"][0]["custom_id"], "hook_angle1_hook1");
        assert_eq!(batch.key(), "campaigns/c-1/batches/b-1/results.json");
    }
}
