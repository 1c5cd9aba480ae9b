//! Marketing angle generation.
//!
//! Angles come from one synchronous message call rather than a batch;
//! they are few and everything after them depends on them.

use adgen_llm_client::{MessageProvider, MessageRequest, ModelTier};
use adgen_models::{angle::renumber, Angle};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::{events, WorkflowLogger};
use crate::prompt::{render, PromptInput, PromptTemplate};
use crate::submission::GenerationContext;

/// Model tier for angles.
pub const ANGLE_TIER: ModelTier = ModelTier::Fast;

/// Generate angles for a campaign, numbered `1..=n` in model order.
pub async fn generate_angles(
    provider: &dyn MessageProvider,
    ctx: &GenerationContext,
) -> WorkerResult<Vec<Angle>> {
    let logger = WorkflowLogger::new(&ctx.campaign_id, "angles");

    let input = PromptInput::new(&ctx.product).with_avatar(ctx.avatar.as_ref());
    let request = MessageRequest::for_tier(ANGLE_TIER, render(&PromptTemplate::angles(), &input));

    let message = provider.create_message(&request).await?;
    let text = message
        .first_text()
        .ok_or_else(|| WorkerError::ai_failed("No text content in angle response"))?;

    let angles = parse_angles(text)?;
    logger.info(
        events::ANGLES_GENERATED,
        &format!(
            "Generated {} angles ({} input / {} output tokens)",
            angles.len(),
            message.usage.input_tokens,
            message.usage.output_tokens
        ),
    );
    Ok(angles)
}

/// Parse the model's JSON array of angles, tolerating a markdown code fence.
pub fn parse_angles(text: &str) -> WorkerResult<Vec<Angle>> {
    let mut angles: Vec<Angle> = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| WorkerError::ai_failed(format!("Failed to parse angles JSON: {}", e)))?;

    angles.retain(|a| !a.concept.trim().is_empty());
    if angles.is_empty() {
        return Err(WorkerError::ai_failed("Model returned no usable angles"));
    }

    renumber(&mut angles);
    Ok(angles)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{text_message, FakeProvider};
    use adgen_models::{CampaignId, Polarity, ProductInfo};

    #[test]
    fn test_parse_fenced_array() {
        let text = "```json\n[\n  {\"category\": \"time\", \"concept\": \"Get your evenings back\", \"type\": \"positive\"},\n  {\"category\": \"cost\", \"concept\": \"Stop overpaying\", \"type\": \"negative\"}\n]\n```";
        let angles = parse_angles(text).unwrap();

        assert_eq!(angles.len(), 2);
        assert_eq!(angles[0].position, 1);
        assert_eq!(angles[1].position, 2);
        assert_eq!(angles[1].polarity, Polarity::Negative);
    }

    #[test]
    fn test_parse_renumbers_model_positions() {
        let text = r#"[{"position": 7, "category": "a", "concept": "x"}, {"position": 7, "category": "b", "concept": "y"}]"#;
        let angles = parse_angles(text).unwrap();
        let positions: Vec<u32> = angles.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_parse_rejects_garbage_and_empty() {
        assert!(matches!(parse_angles("I cannot help"), Err(WorkerError::AiFailed(_))));
        assert!(matches!(parse_angles("[]"), Err(WorkerError::AiFailed(_))));
    }

    #[tokio::test]
    async fn test_generate_angles_uses_fast_tier() {
        let provider = FakeProvider::new();
        provider.push_message(text_message(
            r#"[{"category": "speed", "concept": "Ship faster", "type": "positive"}]"#,
        ));

        let ctx = GenerationContext::new(CampaignId::from("c-3"), ProductInfo::default(), None);
        let angles = generate_angles(&provider, &ctx).await.unwrap();

        assert_eq!(angles.len(), 1);
        assert_eq!(angles[0].category, "speed");

        let requests = provider.message_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, ModelTier::Fast.model());
        assert!(requests[0].prompt().contains("PRODUCT INFORMATION:"));
    }
}
