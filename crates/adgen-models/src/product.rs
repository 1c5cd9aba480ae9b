//! Product and audience research inputs for prompt rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured product information extracted from the product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProductInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_features: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_selling_proposition: Option<String>,
}

/// Customer avatar analysis.
///
/// Every field is optional; prompts render missing fields with a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AvatarAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psychographics: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pain_points: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub desires: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objections: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_journey: Option<String>,
}
