//! Campaign models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::angle::Angle;
use crate::generation::GeneratedText;
use crate::product::{AvatarAnalysis, ProductInfo};
use crate::utils::null_as_default;

/// Unique identifier for a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Generate a new random campaign ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ordered workflow step counter stored on the campaign.
///
/// Serialized as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(into = "u32", try_from = "u32")]
pub enum WorkflowStep {
    #[default]
    Created,
    ProductAnalyzed,
    AvatarAnalyzed,
    AnglesGenerated,
    HooksGenerated,
    ScriptsGenerated,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Created => "created",
            WorkflowStep::ProductAnalyzed => "product_analyzed",
            WorkflowStep::AvatarAnalyzed => "avatar_analyzed",
            WorkflowStep::AnglesGenerated => "angles_generated",
            WorkflowStep::HooksGenerated => "hooks_generated",
            WorkflowStep::ScriptsGenerated => "scripts_generated",
        }
    }
}

impl From<WorkflowStep> for u32 {
    fn from(step: WorkflowStep) -> Self {
        match step {
            WorkflowStep::Created => 0,
            WorkflowStep::ProductAnalyzed => 1,
            WorkflowStep::AvatarAnalyzed => 2,
            WorkflowStep::AnglesGenerated => 3,
            WorkflowStep::HooksGenerated => 4,
            WorkflowStep::ScriptsGenerated => 5,
        }
    }
}

impl TryFrom<u32> for WorkflowStep {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WorkflowStep::Created),
            1 => Ok(WorkflowStep::ProductAnalyzed),
            2 => Ok(WorkflowStep::AvatarAnalyzed),
            3 => Ok(WorkflowStep::AnglesGenerated),
            4 => Ok(WorkflowStep::HooksGenerated),
            5 => Ok(WorkflowStep::ScriptsGenerated),
            other => Err(format!("unknown workflow step {}", other)),
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One marketing-content generation effort, as stored in the `campaigns` table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Campaign {
    pub id: CampaignId,

    /// Owning user
    pub user_id: String,

    /// Product URL as supplied by the user
    pub product_url: String,

    #[serde(default)]
    #[schemars(with = "u32")]
    pub current_step: WorkflowStep,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub product_info: Option<ProductInfo>,

    #[serde(default)]
    pub avatar_analysis: Option<AvatarAnalysis>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub angles: Vec<Angle>,

    /// Succeeded hooks keyed by wire identifier
    #[serde(default, deserialize_with = "null_as_default")]
    pub hooks: BTreeMap<String, GeneratedText>,

    /// Succeeded scripts keyed by wire identifier
    #[serde(default, deserialize_with = "null_as_default")]
    pub scripts: BTreeMap<String, GeneratedText>,

    #[serde(default)]
    pub hook_batch_id: Option<String>,

    #[serde(default)]
    pub script_batch_id: Option<String>,
}

impl Campaign {
    /// Create a new campaign for a user request.
    pub fn new(user_id: impl Into<String>, product_url: impl Into<String>) -> Self {
        Self {
            id: CampaignId::new(),
            user_id: user_id.into(),
            product_url: product_url.into(),
            current_step: WorkflowStep::Created,
            created_at: Utc::now(),
            product_info: None,
            avatar_analysis: None,
            angles: Vec::new(),
            hooks: BTreeMap::new(),
            scripts: BTreeMap::new(),
            hook_batch_id: None,
            script_batch_id: None,
        }
    }

    pub fn has_reached(&self, step: WorkflowStep) -> bool {
        self.current_step >= step
    }
}
