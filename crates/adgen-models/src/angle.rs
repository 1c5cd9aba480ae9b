//! Marketing angle models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether an angle leads with a benefit or with a pain point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }
}

/// A marketing concept used as the seed for hook and script generation.
///
/// Angles are immutable once generated. Every hook and script key refers
/// back to its angle through [`Angle::position`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Angle {
    /// 1-based ordinal within the campaign; 0 until [`renumber`]ed
    #[serde(default)]
    pub position: u32,

    /// Category tag (e.g. "social_proof", "fear_of_missing_out")
    #[serde(default)]
    pub category: String,

    /// Free-text description of the concept
    #[serde(alias = "description", alias = "angle")]
    pub concept: String,

    /// Positive or negative framing
    #[serde(default, alias = "type")]
    pub polarity: Polarity,
}

impl Angle {
    pub fn new(
        position: u32,
        category: impl Into<String>,
        concept: impl Into<String>,
        polarity: Polarity,
    ) -> Self {
        Self {
            position,
            category: category.into(),
            concept: concept.into(),
            polarity,
        }
    }
}

/// Reassign positions `1..=n` in list order.
///
/// Used on model output, which does not reliably number its items.
pub fn renumber(angles: &mut [Angle]) {
    for (index, angle) in angles.iter_mut().enumerate() {
        angle.position = index as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_accepts_model_aliases() {
        let json = r#"{"position": 0, "category": "pain", "description": "Tired of X?", "type": "negative"}"#;
        let angle: Angle = serde_json::from_str(json).unwrap();
        assert_eq!(angle.concept, "Tired of X?");
        assert_eq!(angle.polarity, Polarity::Negative);
    }

    #[test]
    fn test_renumber() {
        let mut angles = vec![
            Angle::new(7, "a", "first", Polarity::Positive),
            Angle::new(7, "b", "second", Polarity::Negative),
        ];
        renumber(&mut angles);
        assert_eq!(angles[0].position, 1);
        assert_eq!(angles[1].position, 2);
    }
}
