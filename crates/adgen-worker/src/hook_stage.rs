//! First stage: hook generation.

use std::collections::HashSet;

use adgen_llm_client::{BatchProvider, GenerationRequest, MessageRequest, ModelTier};
use adgen_models::{Angle, HookKey, HOOKS_PER_ANGLE};

use crate::error::{WorkerError, WorkerResult};
use crate::prompt::{render, PromptInput, PromptTemplate};
use crate::submission::{submit_batch, GenerationContext, Stage, SubmittedBatch};

/// Model tier for hooks.
pub const HOOK_TIER: ModelTier = ModelTier::Fast;

/// Build `HOOKS_PER_ANGLE` requests per angle, one per hook slot.
///
/// Fails without building anything if the list is empty or an angle has
/// position 0 or shares its position with another angle.
pub fn build_hook_requests(
    ctx: &GenerationContext,
    angles: &[Angle],
) -> WorkerResult<Vec<GenerationRequest>> {
    validate_angles(angles)?;

    let template = PromptTemplate::hooks();
    let mut requests = Vec::with_capacity(angles.len() * HOOKS_PER_ANGLE as usize);

    for angle in angles {
        for hook in 1..=HOOKS_PER_ANGLE {
            let input = PromptInput::new(&ctx.product)
                .with_angle(angle)
                .with_hook_slot(hook)
                .with_avatar(ctx.avatar.as_ref());
            let params = MessageRequest::for_tier(HOOK_TIER, render(&template, &input));

            let key = HookKey::new(angle.position, hook);
            requests.push(GenerationRequest::new(key.to_string(), params));
        }
    }

    Ok(requests)
}

/// Submit the hook batch for a campaign. Does not wait for completion.
pub async fn submit_hooks(
    provider: &dyn BatchProvider,
    ctx: &GenerationContext,
    angles: &[Angle],
) -> WorkerResult<SubmittedBatch> {
    let requests = build_hook_requests(ctx, angles)?;
    submit_batch(provider, &ctx.campaign_id, Stage::Hooks, &requests).await
}

fn validate_angles(angles: &[Angle]) -> WorkerResult<()> {
    if angles.is_empty() {
        return Err(WorkerError::validation("angle list is empty"));
    }

    let mut positions = HashSet::with_capacity(angles.len());
    for angle in angles {
        if angle.position == 0 {
            return Err(WorkerError::validation(format!(
                "angle '{}' has position 0; positions are 1-based",
                angle.category
            )));
        }
        if !positions.insert(angle.position) {
            return Err(WorkerError::validation(format!(
                "angle position {} is used more than once",
                angle.position
            )));
        }
    }
    Ok(())
}
