//! Second stage: scripts derived from succeeded hooks.

use std::collections::BTreeMap;

use adgen_llm_client::{BatchProvider, GenerationRequest, MessageRequest, ModelTier};
use adgen_models::{Angle, GeneratedText, HookKey, HookResult, ScriptVariant, SCRIPTS_PER_HOOK};

use crate::error::{WorkerError, WorkerResult};
use crate::prompt::{render, PromptInput, PromptTemplate};
use crate::submission::{submit_batch, GenerationContext, Stage, SubmittedBatch};

/// Model tier for scripts.
pub const SCRIPT_TIER: ModelTier = ModelTier::Quality;

/// Build one request per script variant for every hook.
///
/// Each hook's angle must be in `angles`; otherwise nothing is built.
pub fn build_script_requests<'a>(
    ctx: &GenerationContext,
    angles: &[Angle],
    hooks: impl IntoIterator<Item = &'a HookResult>,
) -> WorkerResult<Vec<GenerationRequest>> {
    let by_position: BTreeMap<u32, &Angle> = angles.iter().map(|a| (a.position, a)).collect();
    let hooks: Vec<&HookResult> = hooks.into_iter().collect();

    if hooks.is_empty() {
        return Err(WorkerError::validation("no succeeded hooks to expand into scripts"));
    }

    let mut requests = Vec::with_capacity(hooks.len() * SCRIPTS_PER_HOOK as usize);
    for hook in hooks {
        let angle = by_position.get(&hook.key.angle).ok_or_else(|| {
            WorkerError::validation(format!(
                "hook {} refers to angle {} which the campaign does not have",
                hook.key, hook.key.angle
            ))
        })?;

        let input = PromptInput::new(&ctx.product)
            .with_angle(angle)
            .with_hook(&hook.text)
            .with_avatar(ctx.avatar.as_ref());

        for variant in ScriptVariant::ALL {
            let prompt = render(&PromptTemplate::script(variant), &input);
            requests.push(GenerationRequest::new(
                hook.key.script(variant).to_string(),
                MessageRequest::for_tier(SCRIPT_TIER, prompt),
            ));
        }
    }

    Ok(requests)
}

/// Submit the script batch for a campaign. Does not wait for completion.
pub async fn submit_scripts<'a>(
    provider: &dyn BatchProvider,
    ctx: &GenerationContext,
    angles: &[Angle],
    hooks: impl IntoIterator<Item = &'a HookResult>,
) -> WorkerResult<SubmittedBatch> {
    let requests = build_script_requests(ctx, angles, hooks)?;
    submit_batch(provider, &ctx.campaign_id, Stage::Scripts, &requests).await
}

/// Rebuild typed hook results from hooks stored under their wire ids.
///
/// Every id is parsed before anything is returned; one malformed id fails
/// the whole set.
pub fn hooks_from_stored(stored: &BTreeMap<String, GeneratedText>) -> WorkerResult<Vec<HookResult>> {
    let keys = stored
        .keys()
        .map(|id| id.parse::<HookKey>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keys
        .into_iter()
        .zip(stored.values())
        .map(|(key, generated)| HookResult {
            key,
            text: generated.text.clone(),
            usage: generated.usage,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProvider;
    use adgen_models::{CampaignId, Polarity, ProductInfo, TokenUsage};

    fn ctx() -> GenerationContext {
        GenerationContext::new(CampaignId::from("c-7"), ProductInfo::default(), None)
    }

    fn angles() -> Vec<Angle> {
        vec![
            Angle::new(1, "speed", "Saves an hour a day", Polarity::Positive),
            Angle::new(2, "fear", "Falling behind", Polarity::Negative),
        ]
    }

    fn hook(angle: u32, hook: u32, text: &str) -> HookResult {
        HookResult {
            key: HookKey::new(angle, hook),
            text: text.to_string(),
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn test_single_hook_yields_two_scripts() {
        let hooks = vec![hook(2, 5, "Still doing it by hand?")];
        let requests = build_script_requests(&ctx(), &angles(), &hooks).unwrap();

        let ids: Vec<&str> = requests.iter().map(|r| r.custom_id.as_str()).collect();
        assert_eq!(ids, vec!["script_angle2_hook5_v1", "script_angle2_hook5_v2"]);
        assert!(requests[0].params.prompt().contains("HOOK:\nStill doing it by hand?"));
        assert!(requests[0].params.prompt().contains("Angle 2: fear"));
    }

    #[test]
    fn test_two_requests_per_hook_with_quality_tier() {
        let hooks: Vec<HookResult> = (1..=21).map(|m| hook(1, m, "h")).collect();
        let requests = build_script_requests(&ctx(), &angles(), &hooks).unwrap();

        assert_eq!(requests.len(), 42);
        assert!(requests.iter().all(|r| r.params.model == ModelTier::Quality.model()));
        assert!(requests.iter().all(|r| r.params.max_tokens == 4096));

        for m in 1..=21 {
            for v in 1..=2 {
                let id = format!("script_angle1_hook{}_v{}", m, v);
                assert!(requests.iter().any(|r| r.custom_id == id), "missing {}", id);
            }
        }
    }

    #[test]
    fn test_variants_get_different_prompts() {
        let hooks = vec![hook(1, 1, "h")];
        let requests = build_script_requests(&ctx(), &angles(), &hooks).unwrap();
        assert_ne!(requests[0].params.prompt(), requests[1].params.prompt());
    }

    #[test]
    fn test_unknown_angle_builds_nothing() {
        let hooks = vec![hook(1, 1, "ok"), hook(9, 1, "orphan")];
        assert!(matches!(
            build_script_requests(&ctx(), &angles(), &hooks),
            Err(WorkerError::Validation(_))
        ));
    }

    #[test]
    fn test_hooks_from_stored_parses_ids() {
        let mut stored = BTreeMap::new();
        stored.insert(
            "hook_angle2_hook5".to_string(),
            GeneratedText {
                text: "Stored hook".to_string(),
                usage: TokenUsage::default(),
            },
        );

        let hooks = hooks_from_stored(&stored).unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].key, HookKey::new(2, 5));
        assert_eq!(hooks[0].text, "Stored hook");
    }

    #[tokio::test]
    async fn test_malformed_stored_id_aborts_before_submission() {
        let mut stored = BTreeMap::new();
        for id in ["hook_angle1_hook1", "hook_angle1_hook2_extra"] {
            stored.insert(
                id.to_string(),
                GeneratedText {
                    text: "x".to_string(),
                    usage: TokenUsage::default(),
                },
            );
        }

        let provider = FakeProvider::new();
        let result = async {
            let hooks = hooks_from_stored(&stored)?;
            submit_scripts(&provider, &ctx(), &angles(), &hooks).await
        }
        .await;

        assert!(matches!(result, Err(WorkerError::MalformedIdentifier(_))));
        assert!(provider.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_submit_scripts() {
        let provider = FakeProvider::new();
        let hooks = vec![hook(1, 3, "a"), hook(2, 4, "b")];

        let batch = submit_scripts(&provider, &ctx(), &angles(), &hooks).await.unwrap();
        assert_eq!(batch.stage, Stage::Scripts);
        assert_eq!(batch.request_count, 4);
        assert_eq!(provider.submissions()[0].len(), 4);
    }
}
