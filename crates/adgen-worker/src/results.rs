//! Retrieval and classification of batch results.
//!
//! Results are matched to requests by id only; the provider's line order
//! carries no meaning. Every streamed line lands in exactly one bucket:
//! succeeded hooks, succeeded scripts, per-item errors, or unclassified.

use std::collections::BTreeMap;

use serde::Serialize;

use adgen_llm_client::{BatchItemResult, BatchProvider, BatchResultLine};
use adgen_models::{
    HookKey, HookResult, ItemError, ItemErrorKind, RequestKey, ScriptKey, ScriptResult, TokenUsage,
};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::{events, WorkflowLogger};
use crate::metrics::record_items;
use crate::poller::{check_status, BatchStatusReport};

/// Counts per bucket. `hooks + scripts + errors + unclassified == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalSummary {
    pub total: usize,
    pub hooks: usize,
    pub scripts: usize,
    pub errors: usize,
    pub unclassified: usize,
    /// Tokens spent on succeeded items
    pub usage: TokenUsage,
}

/// Partitioned results of one ended batch.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    /// Lines read from the provider, counted before classification
    pub total: usize,
    pub hooks: BTreeMap<HookKey, HookResult>,
    pub scripts: BTreeMap<ScriptKey, ScriptResult>,
    pub errors: Vec<ItemError>,
    /// Ids that are not ours, are malformed, or were seen twice
    pub unclassified: Vec<String>,
}

impl RetrievalOutcome {
    pub fn summary(&self) -> RetrievalSummary {
        let mut usage = TokenUsage::default();
        for hook in self.hooks.values() {
            usage += hook.usage;
        }
        for script in self.scripts.values() {
            usage += script.usage;
        }

        RetrievalSummary {
            total: self.total,
            hooks: self.hooks.len(),
            scripts: self.scripts.len(),
            errors: self.errors.len(),
            unclassified: self.unclassified.len(),
            usage,
        }
    }

    /// Whether every line landed in exactly one bucket.
    pub fn is_partition(&self) -> bool {
        self.hooks.len() + self.scripts.len() + self.errors.len() + self.unclassified.len() == self.total
    }
}

/// Read the status, then the raw result lines, of an ended batch.
///
/// A batch that has not ended yields [`WorkerError::PrematureRetrieval`]
/// and its results are never read.
pub async fn fetch_ended_results(
    provider: &dyn BatchProvider,
    batch_id: &str,
    logger: &WorkflowLogger,
) -> WorkerResult<(BatchStatusReport, Vec<BatchResultLine>)> {
    let report = check_status(provider, batch_id, logger).await?;

    if !report.is_ended() {
        logger.warn(
            events::PREMATURE_RETRIEVAL,
            &format!("Results of batch {} requested while {}", batch_id, report.status),
        );
        return Err(WorkerError::PrematureRetrieval {
            batch_id: batch_id.to_string(),
            status: report.status,
        });
    }

    let lines = provider.batch_results(batch_id).await.map_err(|source| {
        logger.error(
            events::RETRIEVAL_FAILED,
            &format!("Reading results of batch {} failed: {}", batch_id, source),
        );
        WorkerError::Retrieval {
            batch_id: batch_id.to_string(),
            source,
        }
    })?;

    Ok((report, lines))
}

/// Retrieve and classify the results of an ended batch.
pub async fn retrieve_results(
    provider: &dyn BatchProvider,
    batch_id: &str,
    logger: &WorkflowLogger,
) -> WorkerResult<RetrievalOutcome> {
    let (_, lines) = fetch_ended_results(provider, batch_id, logger).await?;
    let outcome = classify(lines, logger);

    let summary = outcome.summary();
    logger.info(
        events::RESULTS_RETRIEVED,
        &format!(
            "Batch {}: {} results, {} hooks, {} scripts, {} errors, {} unclassified, {} tokens",
            batch_id,
            summary.total,
            summary.hooks,
            summary.scripts,
            summary.errors,
            summary.unclassified,
            summary.usage.total()
        ),
    );
    Ok(outcome)
}

/// Partition result lines by outcome and request kind.
pub fn classify(lines: Vec<BatchResultLine>, logger: &WorkflowLogger) -> RetrievalOutcome {
    let mut outcome = RetrievalOutcome {
        total: lines.len(),
        ..Default::default()
    };

    for line in lines {
        let key = match RequestKey::classify(&line.custom_id) {
            Some(Ok(key)) => key,
            Some(Err(e)) => {
                logger.warn(events::MALFORMED_IDENTIFIER, &e.to_string());
                outcome.unclassified.push(line.custom_id);
                continue;
            }
            None => {
                logger.warn(
                    events::UNCLASSIFIED_RESULT,
                    &format!("Result '{}' has no known prefix", line.custom_id),
                );
                outcome.unclassified.push(line.custom_id);
                continue;
            }
        };

        if outcome_contains(&outcome, &key) {
            logger.warn(
                events::UNCLASSIFIED_RESULT,
                &format!("Result '{}' was delivered more than once", line.custom_id),
            );
            outcome.unclassified.push(line.custom_id);
            continue;
        }

        let message = match line.result {
            BatchItemResult::Succeeded { message } => message,
            other => {
                outcome.errors.push(ItemError {
                    detail: other.error_detail().unwrap_or_default(),
                    kind: other.error_kind().unwrap_or(ItemErrorKind::Errored),
                    custom_id: line.custom_id,
                });
                continue;
            }
        };

        let Some(text) = message.first_text().map(str::to_string) else {
            outcome.errors.push(ItemError {
                custom_id: line.custom_id,
                kind: ItemErrorKind::Errored,
                detail: "succeeded without a text content block".to_string(),
            });
            continue;
        };

        match key {
            RequestKey::Hook(key) => {
                outcome.hooks.insert(
                    key,
                    HookResult {
                        key,
                        text,
                        usage: message.usage,
                    },
                );
            }
            RequestKey::Script(key) => {
                outcome.scripts.insert(
                    key,
                    ScriptResult {
                        key,
                        text,
                        usage: message.usage,
                    },
                );
            }
        }
    }

    let stage = logger.stage().to_string();
    record_items(&stage, "hook", outcome.hooks.len());
    record_items(&stage, "script", outcome.scripts.len());
    record_items(&stage, "error", outcome.errors.len());
    record_items(&stage, "unclassified", outcome.unclassified.len());

    debug_assert!(outcome.is_partition());
    outcome
}

fn outcome_contains(outcome: &RetrievalOutcome, key: &RequestKey) -> bool {
    let succeeded = match key {
        RequestKey::Hook(k) => outcome.hooks.contains_key(k),
        RequestKey::Script(k) => outcome.scripts.contains_key(k),
    };
    if succeeded {
        return true;
    }

    let id = key.to_string();
    outcome.errors.iter().any(|e| e.custom_id == id)
}
