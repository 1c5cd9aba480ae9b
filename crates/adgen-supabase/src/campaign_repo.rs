//! Typed repository for campaign rows.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::info;

use adgen_models::{Angle, Campaign, CampaignId, GeneratedText, WorkflowStep};

use crate::client::{Filter, SupabaseClient};
use crate::error::{SupabaseError, SupabaseResult};

const TABLE: &str = "campaigns";

/// Repository for the `campaigns` table.
///
/// Campaigns are never deleted here; they only move forward through
/// [`WorkflowStep`]s.
#[derive(Clone)]
pub struct CampaignRepository {
    client: SupabaseClient,
}

impl CampaignRepository {
    /// Create a new campaign repository.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Get a campaign by ID.
    pub async fn get(&self, campaign_id: &CampaignId) -> SupabaseResult<Option<Campaign>> {
        self.client
            .select_one(TABLE, &[Filter::eq("id", campaign_id)])
            .await
    }

    /// Get a campaign, failing if it does not exist.
    pub async fn require(&self, campaign_id: &CampaignId) -> SupabaseResult<Campaign> {
        self.get(campaign_id)
            .await?
            .ok_or_else(|| SupabaseError::not_found(format!("{}/{}", TABLE, campaign_id)))
    }

    /// Create a new campaign record.
    pub async fn create(&self, campaign: &Campaign) -> SupabaseResult<Campaign> {
        let stored: Campaign = self.client.insert(TABLE, campaign).await?;
        info!(campaign_id = %stored.id, user_id = %stored.user_id, "Created campaign");
        Ok(stored)
    }

    /// Store generated angles and advance to [`WorkflowStep::AnglesGenerated`].
    pub async fn save_angles(&self, campaign_id: &CampaignId, angles: &[Angle]) -> SupabaseResult<()> {
        self.patch(campaign_id, json!({ "angles": angles })).await?;
        self.advance_step(campaign_id, WorkflowStep::AnglesGenerated).await?;
        info!(campaign_id = %campaign_id, angles = angles.len(), "Saved angles");
        Ok(())
    }

    /// Record the provider batch ID of the hook stage.
    pub async fn set_hook_batch(&self, campaign_id: &CampaignId, batch_id: &str) -> SupabaseResult<()> {
        self.patch(campaign_id, json!({ "hook_batch_id": batch_id })).await
    }

    /// Record the provider batch ID of the script stage.
    pub async fn set_script_batch(&self, campaign_id: &CampaignId, batch_id: &str) -> SupabaseResult<()> {
        self.patch(campaign_id, json!({ "script_batch_id": batch_id })).await
    }

    /// Store succeeded hooks and advance to [`WorkflowStep::HooksGenerated`].
    pub async fn save_hooks(
        &self,
        campaign_id: &CampaignId,
        hooks: &BTreeMap<String, GeneratedText>,
    ) -> SupabaseResult<()> {
        self.patch(campaign_id, json!({ "hooks": hooks })).await?;
        self.advance_step(campaign_id, WorkflowStep::HooksGenerated).await?;
        info!(campaign_id = %campaign_id, hooks = hooks.len(), "Saved hooks");
        Ok(())
    }

    /// Store succeeded scripts and advance to [`WorkflowStep::ScriptsGenerated`].
    pub async fn save_scripts(
        &self,
        campaign_id: &CampaignId,
        scripts: &BTreeMap<String, GeneratedText>,
    ) -> SupabaseResult<()> {
        self.patch(campaign_id, json!({ "scripts": scripts })).await?;
        self.advance_step(campaign_id, WorkflowStep::ScriptsGenerated).await?;
        info!(campaign_id = %campaign_id, scripts = scripts.len(), "Saved scripts");
        Ok(())
    }

    /// Move the step counter forward. Never moves it backwards.
    ///
    /// Returns `true` if the row was updated.
    pub async fn advance_step(&self, campaign_id: &CampaignId, step: WorkflowStep) -> SupabaseResult<bool> {
        let value = u32::from(step);
        let updated = self
            .client
            .update(
                TABLE,
                &[Filter::eq("id", campaign_id), Filter::lt("current_step", value)],
                &json!({ "current_step": value }),
            )
            .await?;
        Ok(updated > 0)
    }

    async fn patch(&self, campaign_id: &CampaignId, patch: serde_json::Value) -> SupabaseResult<()> {
        let updated = self
            .client
            .update(TABLE, &[Filter::eq("id", campaign_id)], &patch)
            .await?;

        if updated == 0 {
            return Err(SupabaseError::not_found(format!("{}/{}", TABLE, campaign_id)));
        }
        Ok(())
    }
}
