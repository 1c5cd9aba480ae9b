//! End-to-end campaign pipeline.
//!
//! Drives one campaign through angles, hooks and scripts, persisting after
//! every stage. A campaign that already has a stage's output (or a batch id
//! for it) resumes from there instead of generating again.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use adgen_llm_client::{BatchProvider, BatchResultLine, MessageProvider};
use adgen_models::{Angle, Campaign, CampaignId, GeneratedText, HookResult, WorkflowStep};
use adgen_storage::{ArchivedBatch, S3Client};
use adgen_supabase::CampaignRepository;

use crate::angles::generate_angles;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::hook_stage::submit_hooks;
use crate::logging::{events, WorkflowLogger};
use crate::metrics::record_wait;
use crate::poller::{check_status, BatchStatusReport, BatchTracker, PollPolicy, TrackerState};
use crate::results::{classify, fetch_ended_results, RetrievalOutcome, RetrievalSummary};
use crate::script_stage::{hooks_from_stored, submit_scripts};
use crate::submission::{GenerationContext, Stage, SubmittedBatch};

/// What a pipeline run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub campaign_id: String,
    pub angles: usize,
    pub hooks: usize,
    pub scripts: usize,
    pub hook_batch: Option<RetrievalSummary>,
    pub script_batch: Option<RetrievalSummary>,
}

/// Poll a batch until it ends or the policy deadline passes.
///
/// Status-read failures are returned as-is; nothing is retried here.
pub async fn wait_for_completion(
    provider: &dyn BatchProvider,
    batch: SubmittedBatch,
    policy: &PollPolicy,
) -> WorkerResult<BatchTracker> {
    let logger = WorkflowLogger::new(&batch.campaign_id, batch.stage.as_str());
    let stage = batch.stage;
    let mut tracker = BatchTracker::new(batch);

    loop {
        let report = check_status(provider, tracker.batch_id(), &logger).await?;
        if tracker.observe(report).is_terminal() {
            record_wait(stage, tracker.elapsed().as_secs_f64());
            return Ok(tracker);
        }

        if tracker.check_deadline(policy) {
            logger.error(
                events::BATCH_STUCK,
                &format!(
                    "Batch {} still not ended after {} polls",
                    tracker.batch_id(),
                    tracker.polls()
                ),
            );
            return Err(WorkerError::BatchStuck {
                batch_id: tracker.batch_id().to_string(),
                waited_secs: tracker.elapsed().as_secs(),
            });
        }

        tokio::time::sleep(policy.interval).await;
    }
}

/// Runs campaigns end to end.
pub struct CampaignPipeline {
    batches: Arc<dyn BatchProvider>,
    messages: Arc<dyn MessageProvider>,
    campaigns: CampaignRepository,
    store: Option<S3Client>,
    config: WorkerConfig,
}

impl CampaignPipeline {
    pub fn new(
        batches: Arc<dyn BatchProvider>,
        messages: Arc<dyn MessageProvider>,
        campaigns: CampaignRepository,
        store: Option<S3Client>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            batches,
            messages,
            campaigns,
            store,
            config,
        }
    }

    /// Run a campaign to [`WorkflowStep::ScriptsGenerated`].
    pub async fn run(&self, campaign_id: &CampaignId) -> WorkerResult<PipelineReport> {
        let logger = WorkflowLogger::new(campaign_id, "pipeline");
        let span = logger.create_span();

        async {
            logger.info(events::PIPELINE_STARTED, "Pipeline started");

            let campaign = self.campaigns.require(campaign_id).await?;
            let ctx = GenerationContext::from_campaign(&campaign)?;
            let mut report = PipelineReport {
                campaign_id: campaign_id.to_string(),
                ..Default::default()
            };

            let angles = self.ensure_angles(&campaign, &ctx).await?;
            report.angles = angles.len();

            let hooks = if campaign.has_reached(WorkflowStep::HooksGenerated) && !campaign.hooks.is_empty() {
                hooks_from_stored(&campaign.hooks)?
            } else {
                let (outcome, summary) = self.run_hook_stage(&campaign, &ctx, &angles).await?;
                report.hook_batch = Some(summary);
                outcome.hooks.into_values().collect()
            };
            report.hooks = hooks.len();

            if campaign.has_reached(WorkflowStep::ScriptsGenerated) {
                report.scripts = campaign.scripts.len();
            } else {
                let (outcome, summary) = self.run_script_stage(&campaign, &ctx, &angles, &hooks).await?;
                report.script_batch = Some(summary);
                report.scripts = outcome.scripts.len();
            }

            logger.info(
                events::PIPELINE_COMPLETED,
                &format!(
                    "Pipeline completed: {} angles, {} hooks, {} scripts",
                    report.angles, report.hooks, report.scripts
                ),
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn ensure_angles(&self, campaign: &Campaign, ctx: &GenerationContext) -> WorkerResult<Vec<Angle>> {
        if !campaign.angles.is_empty() {
            return Ok(campaign.angles.clone());
        }

        let angles = generate_angles(self.messages.as_ref(), ctx).await?;
        self.campaigns.save_angles(&campaign.id, &angles).await?;
        Ok(angles)
    }

    async fn run_hook_stage(
        &self,
        campaign: &Campaign,
        ctx: &GenerationContext,
        angles: &[Angle],
    ) -> WorkerResult<(RetrievalOutcome, RetrievalSummary)> {
        let batch = match &campaign.hook_batch_id {
            Some(batch_id) => SubmittedBatch::resumed(batch_id, Stage::Hooks, &campaign.id),
            None => {
                let batch = submit_hooks(self.batches.as_ref(), ctx, angles).await?;
                self.campaigns.set_hook_batch(&campaign.id, &batch.batch_id).await?;
                batch
            }
        };

        let (outcome, summary) = self.collect(batch).await?;
        if outcome.hooks.is_empty() {
            return Err(WorkerError::ai_failed(format!(
                "hook batch for campaign {} produced no usable hooks ({} errors)",
                campaign.id, summary.errors
            )));
        }

        let stored: BTreeMap<String, GeneratedText> = outcome
            .hooks
            .iter()
            .map(|(key, hook)| (key.to_string(), hook.to_generated()))
            .collect();
        self.campaigns.save_hooks(&campaign.id, &stored).await?;

        Ok((outcome, summary))
    }

    async fn run_script_stage(
        &self,
        campaign: &Campaign,
        ctx: &GenerationContext,
        angles: &[Angle],
        hooks: &[HookResult],
    ) -> WorkerResult<(RetrievalOutcome, RetrievalSummary)> {
        let batch = match &campaign.script_batch_id {
            Some(batch_id) => SubmittedBatch::resumed(batch_id, Stage::Scripts, &campaign.id),
            None => {
                let batch = submit_scripts(self.batches.as_ref(), ctx, angles, hooks).await?;
                self.campaigns.set_script_batch(&campaign.id, &batch.batch_id).await?;
                batch
            }
        };

        let (outcome, summary) = self.collect(batch).await?;
        if outcome.scripts.is_empty() {
            return Err(WorkerError::ai_failed(format!(
                "script batch for campaign {} produced no usable scripts ({} errors)",
                campaign.id, summary.errors
            )));
        }

        let stored: BTreeMap<String, GeneratedText> = outcome
            .scripts
            .iter()
            .map(|(key, script)| (key.to_string(), script.to_generated()))
            .collect();
        self.campaigns.save_scripts(&campaign.id, &stored).await?;

        Ok((outcome, summary))
    }

    /// Wait for a batch, then read, archive and classify its results.
    async fn collect(&self, batch: SubmittedBatch) -> WorkerResult<(RetrievalOutcome, RetrievalSummary)> {
        let campaign_id = batch.campaign_id.clone();
        let stage = batch.stage;
        let logger = WorkflowLogger::new(&campaign_id, stage.as_str());

        let tracker = wait_for_completion(self.batches.as_ref(), batch, &self.config.poll).await?;
        if tracker.state() == TrackerState::TerminalFailed {
            logger.warn(
                events::BATCH_FAILED,
                &format!("Batch {} ended without any succeeded request", tracker.batch_id()),
            );
        }

        let (report, lines) = fetch_ended_results(self.batches.as_ref(), tracker.batch_id(), &logger).await?;
        self.archive(&campaign_id, stage, &report, &lines, &logger).await;

        let outcome = classify(lines, &logger);
        let summary = outcome.summary();
        logger.info(
            events::RESULTS_RETRIEVED,
            &format!(
                "Batch {}: {} results, {} hooks, {} scripts, {} errors, {} unclassified, {} tokens",
                report.batch_id,
                summary.total,
                summary.hooks,
                summary.scripts,
                summary.errors,
                summary.unclassified,
                summary.usage.total()
            ),
        );
        Ok((outcome, summary))
    }

    async fn archive(
        &self,
        campaign_id: &CampaignId,
        stage: Stage,
        report: &BatchStatusReport,
        lines: &[BatchResultLine],
        logger: &WorkflowLogger,
    ) {
        let Some(store) = self.store.as_ref().filter(|_| self.config.archive_results) else {
            return;
        };

        let archived = ArchivedBatch::new(
            campaign_id.clone(),
            report.batch_id.clone(),
            stage.as_str(),
            report.counts,
            lines.to_vec(),
        );
        if let Err(e) = store.archive_batch(&archived).await {
            logger.warn(
                events::ARCHIVE_FAILED,
                &format!("Archiving results of batch {} failed: {}", report.batch_id, e),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{batch_job, errored_line, succeeded_line, text_message, FakeProvider};
    use adgen_models::ProcessingStatus;
    use adgen_storage::S3Config;
    use adgen_supabase::{RetryConfig, SupabaseClient, SupabaseConfig};
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn submitted() -> SubmittedBatch {
        SubmittedBatch {
            batch_id: "batch_abc".to_string(),
            stage: Stage::Hooks,
            campaign_id: CampaignId::from("c-1"),
            request_count: 21,
            submitted_at: Utc::now(),
        }
    }

    fn fast_policy(timeout_ms: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_wait_polls_until_ended() {
        let provider = FakeProvider::new();
        provider.push_status(batch_job("batch_abc", ProcessingStatus::InProgress, 0, 0));
        provider.push_status(batch_job("batch_abc", ProcessingStatus::InProgress, 0, 0));
        provider.push_status(batch_job("batch_abc", ProcessingStatus::Ended, 21, 0));

        let tracker = wait_for_completion(&provider, submitted(), &fast_policy(5_000))
            .await
            .unwrap();

        assert_eq!(tracker.state(), TrackerState::TerminalSucceeded);
        assert_eq!(tracker.polls(), 3);
        assert_eq!(provider.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_timeout() {
        let provider = FakeProvider::new();
        provider.push_status(batch_job("batch_abc", ProcessingStatus::InProgress, 0, 0));

        let err = wait_for_completion(&provider, submitted(), &fast_policy(20))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::BatchStuck { .. }));
        assert_eq!(err.batch_id(), Some("batch_abc"));
    }

    #[tokio::test]
    async fn test_wait_propagates_status_errors() {
        let provider = FakeProvider::new();

        let err = wait_for_completion(&provider, submitted(), &fast_policy(5_000))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::StatusCheck { .. }));
        assert_eq!(provider.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_wait_reports_failed_batch() {
        let provider = FakeProvider::new();
        provider.push_status(batch_job("batch_abc", ProcessingStatus::Ended, 0, 21));

        let tracker = wait_for_completion(&provider, submitted(), &fast_policy(5_000))
            .await
            .unwrap();
        assert_eq!(tracker.state(), TrackerState::TerminalFailed);
    }

    fn campaign_row(overrides: serde_json::Value) -> serde_json::Value {
        let mut row = json!({
            "id": "c-1",
            "user_id": "u-1",
            "product_url": "https://example.com/widget",
            "current_step": 3,
            "created_at": "2024-05-01T10:00:00Z",
            "product_info": {"name": "Widget", "key_features": ["fast"]},
            "avatar_analysis": null,
            "angles": [{"position": 1, "category": "speed", "concept": "Saves time", "polarity": "positive"}],
            "hooks": null,
            "scripts": null,
            "hook_batch_id": null,
            "script_batch_id": null
        });
        if let (Some(row), Some(overrides)) = (row.as_object_mut(), overrides.as_object()) {
            for (k, v) in overrides {
                row.insert(k.clone(), v.clone());
            }
        }
        row
    }

    fn stored_hook(text: &str) -> serde_json::Value {
        json!({"text": text, "usage": {"input_tokens": 10, "output_tokens": 5}})
    }

    /// Serve one campaign row and accept every patch.
    async fn postgrest(row: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/campaigns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/campaigns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c-1"}])))
            .with_priority(10)
            .mount(&server)
            .await;

        server
    }

    /// Expect exactly `times` patches whose body contains `body`.
    async fn expect_patch(server: &MockServer, body: serde_json::Value, times: u64) {
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/campaigns"))
            .and(body_partial_json(body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c-1"}])))
            .with_priority(1)
            .expect(times)
            .mount(server)
            .await;
    }

    fn repository(server: &MockServer) -> CampaignRepository {
        let mut config = SupabaseConfig::new(server.uri(), "service-key");
        config.retry = RetryConfig::disabled();
        CampaignRepository::new(SupabaseClient::new(config).unwrap())
    }

    fn pipeline(provider: &Arc<FakeProvider>, server: &MockServer, store: Option<S3Client>) -> CampaignPipeline {
        let config = WorkerConfig {
            poll: fast_policy(5_000),
            archive_results: store.is_some(),
        };
        CampaignPipeline::new(provider.clone(), provider.clone(), repository(server), store, config)
    }

    #[tokio::test]
    async fn test_run_generates_every_stage() {
        let server = postgrest(campaign_row(json!({"current_step": 2, "angles": null}))).await;
        expect_patch(&server, json!({"angles": [{"position": 1, "category": "speed"}]}), 1).await;
        expect_patch(&server, json!({"hook_batch_id": "batch_1"}), 1).await;
        expect_patch(&server, json!({"script_batch_id": "batch_2"}), 1).await;
        expect_patch(&server, json!({"current_step": 5}), 1).await;

        let provider = Arc::new(FakeProvider::new());
        provider.push_message(text_message(
            r#"[{"category": "speed", "concept": "Ship faster", "type": "positive"}]"#,
        ));
        provider.push_status(batch_job("batch", ProcessingStatus::Ended, 2, 1));
        provider.set_results(
            "batch_1",
            vec![
                succeeded_line("hook_angle1_hook2", "Still waiting?"),
                errored_line("hook_angle1_hook3", "overloaded_error", "Overloaded"),
                succeeded_line("hook_angle1_hook1", "Stop scrolling."),
            ],
        );
        provider.set_results(
            "batch_2",
            vec![
                succeeded_line("script_angle1_hook1_v1", "Script 1"),
                succeeded_line("script_angle1_hook1_v2", "Script 2"),
                succeeded_line("script_angle1_hook2_v1", "Script 3"),
            ],
        );

        let report = pipeline(&provider, &server, None)
            .run(&CampaignId::from("c-1"))
            .await
            .unwrap();

        assert_eq!(report.angles, 1);
        assert_eq!(report.hooks, 2);
        assert_eq!(report.scripts, 3);
        assert_eq!(report.hook_batch.unwrap().errors, 1);
        assert_eq!(report.script_batch.unwrap().total, 3);

        let submissions = provider.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].len(), 21);
        assert_eq!(submissions[1].len(), 4);
    }

    #[tokio::test]
    async fn test_run_resumes_from_stored_hooks() {
        let server = postgrest(campaign_row(json!({
            "current_step": 4,
            "hooks": {"hook_angle1_hook3": stored_hook("Tired of waiting?")}
        })))
        .await;
        expect_patch(&server, json!({"hook_batch_id": "batch_1"}), 0).await;

        let provider = Arc::new(FakeProvider::new());
        provider.push_status(batch_job("batch", ProcessingStatus::Ended, 2, 0));
        provider.set_results(
            "batch_1",
            vec![
                succeeded_line("script_angle1_hook3_v1", "Direct"),
                succeeded_line("script_angle1_hook3_v2", "Story"),
            ],
        );

        let report = pipeline(&provider, &server, None)
            .run(&CampaignId::from("c-1"))
            .await
            .unwrap();

        assert_eq!(report.hooks, 1);
        assert!(report.hook_batch.is_none());
        assert_eq!(report.scripts, 2);

        let submissions = provider.submissions();
        assert_eq!(submissions.len(), 1);
        let ids: Vec<&str> = submissions[0].iter().map(|r| r.custom_id.as_str()).collect();
        assert_eq!(ids, vec!["script_angle1_hook3_v1", "script_angle1_hook3_v2"]);
    }

    #[tokio::test]
    async fn test_run_resumes_stored_batch_ids() {
        let server = postgrest(campaign_row(json!({
            "hook_batch_id": "msgbatch_hooks",
            "script_batch_id": "msgbatch_scripts"
        })))
        .await;
        expect_patch(&server, json!({"hook_batch_id": "batch_1"}), 0).await;
        expect_patch(&server, json!({"current_step": 4}), 1).await;
        expect_patch(&server, json!({"current_step": 5}), 1).await;

        let provider = Arc::new(FakeProvider::new());
        provider.push_status(batch_job("batch", ProcessingStatus::Ended, 1, 0));
        provider.set_results("msgbatch_hooks", vec![succeeded_line("hook_angle1_hook1", "Hook")]);
        provider.set_results(
            "msgbatch_scripts",
            vec![succeeded_line("script_angle1_hook1_v1", "Script")],
        );

        let report = pipeline(&provider, &server, None)
            .run(&CampaignId::from("c-1"))
            .await
            .unwrap();

        assert_eq!(report.hooks, 1);
        assert_eq!(report.scripts, 1);
        assert!(provider.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_run_fails_when_no_hook_succeeds() {
        let server = postgrest(campaign_row(json!({}))).await;
        expect_patch(&server, json!({"current_step": 4}), 0).await;

        let provider = Arc::new(FakeProvider::new());
        provider.push_status(batch_job("batch", ProcessingStatus::Ended, 0, 21));
        provider.set_results(
            "batch_1",
            (1..=21)
                .map(|m| errored_line(&format!("hook_angle1_hook{}", m), "api_error", "boom"))
                .collect(),
        );

        let err = pipeline(&provider, &server, None)
            .run(&CampaignId::from("c-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::AiFailed(_)));
        assert_eq!(provider.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_run_fails_when_no_script_succeeds() {
        let server = postgrest(campaign_row(json!({
            "current_step": 4,
            "hooks": {"hook_angle1_hook1": stored_hook("Hook")}
        })))
        .await;
        expect_patch(&server, json!({"current_step": 5}), 0).await;

        let provider = Arc::new(FakeProvider::new());
        provider.push_status(batch_job("batch", ProcessingStatus::Ended, 0, 2));
        provider.set_results(
            "batch_1",
            vec![
                errored_line("script_angle1_hook1_v1", "api_error", "boom"),
                errored_line("script_angle1_hook1_v2", "api_error", "boom"),
            ],
        );

        let err = pipeline(&provider, &server, None)
            .run(&CampaignId::from("c-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::AiFailed(_)));
    }

    #[tokio::test]
    async fn test_archive_failure_does_not_fail_run() {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let server = postgrest(campaign_row(json!({
            "current_step": 4,
            "hooks": {"hook_angle1_hook1": stored_hook("Hook")}
        })))
        .await;
        expect_patch(&server, json!({"current_step": 5}), 1).await;

        let s3 = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1..)
            .mount(&s3)
            .await;

        let mut s3_config = S3Config::new("artifacts");
        s3_config.endpoint_url = Some(s3.uri());
        s3_config.access_key_id = Some("test".to_string());
        s3_config.secret_access_key = Some("test".to_string());
        let store = S3Client::new(s3_config).await.unwrap();

        let provider = Arc::new(FakeProvider::new());
        provider.push_status(batch_job("batch", ProcessingStatus::Ended, 1, 0));
        provider.set_results("batch_1", vec![succeeded_line("script_angle1_hook1_v2", "Story")]);

        let report = pipeline(&provider, &server, Some(store))
            .run(&CampaignId::from("c-1"))
            .await
            .unwrap();

        assert_eq!(report.scripts, 1);
    }
}
