//! Batch status reads and the batch lifecycle state machine.
//!
//! [`check_status`] is a single read; it never waits and never retries.
//! How often to call it and when to give up is decided by the caller
//! through a [`PollPolicy`], with a [`BatchTracker`] recording where the
//! batch is in its lifecycle.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use adgen_llm_client::BatchProvider;
use adgen_models::{BatchJob, ProcessingStatus, RequestCounts};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::{events, WorkflowLogger};
use crate::submission::SubmittedBatch;

/// Aggregate state of a batch at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatusReport {
    pub batch_id: String,
    pub status: ProcessingStatus,
    pub counts: RequestCounts,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BatchStatusReport {
    pub fn is_ended(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<BatchJob> for BatchStatusReport {
    fn from(job: BatchJob) -> Self {
        Self {
            batch_id: job.id,
            status: job.processing_status,
            counts: job.request_counts,
            created_at: job.created_at,
            ended_at: job.ended_at,
            expires_at: job.expires_at,
        }
    }
}

/// Read the current state of a batch.
pub async fn check_status(
    provider: &dyn BatchProvider,
    batch_id: &str,
    logger: &WorkflowLogger,
) -> WorkerResult<BatchStatusReport> {
    match provider.retrieve_batch(batch_id).await {
        Ok(job) => {
            let report = BatchStatusReport::from(job);
            logger.info(
                events::STATUS_CHECKED,
                &format!(
                    "Batch {} is {} ({} processing, {} succeeded, {} failed)",
                    batch_id,
                    report.status,
                    report.counts.processing,
                    report.counts.succeeded,
                    report.counts.failed()
                ),
            );
            Ok(report)
        }
        Err(source) => {
            logger.error(
                events::STATUS_CHECK_FAILED,
                &format!("Status check of batch {} failed: {}", batch_id, source),
            );
            Err(WorkerError::StatusCheck {
                batch_id: batch_id.to_string(),
                source,
            })
        }
    }
}

/// Polling cadence and deadline, owned by whoever waits on a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two status reads
    pub interval: Duration,
    /// Time after which a batch that has not ended is considered stuck
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Lifecycle state of a tracked batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    /// Accepted by the provider, not yet observed
    Submitted,
    /// Observed at least once and still processing
    Polling,
    /// Ended with at least one succeeded request
    TerminalSucceeded,
    /// Ended with nothing usable, or abandoned after the deadline
    TerminalFailed,
}

impl TrackerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminalSucceeded | Self::TerminalFailed)
    }
}

/// Why a batch ended in [`TrackerState::TerminalFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Ended, but every request errored, was canceled or expired
    NothingSucceeded,
    /// Did not end before the poll deadline
    TimedOut,
}

/// State machine over one submitted batch.
#[derive(Debug, Clone)]
pub struct BatchTracker {
    batch: SubmittedBatch,
    state: TrackerState,
    failure: Option<FailureReason>,
    last_report: Option<BatchStatusReport>,
    polls: u32,
    started: Instant,
}

impl BatchTracker {
    pub fn new(batch: SubmittedBatch) -> Self {
        Self {
            batch,
            state: TrackerState::Submitted,
            failure: None,
            last_report: None,
            polls: 0,
            started: Instant::now(),
        }
    }

    pub fn batch(&self) -> &SubmittedBatch {
        &self.batch
    }

    pub fn batch_id(&self) -> &str {
        &self.batch.batch_id
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn failure(&self) -> Option<FailureReason> {
        self.failure
    }

    pub fn last_report(&self) -> Option<&BatchStatusReport> {
        self.last_report.as_ref()
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Apply a status read. Terminal states are final; later reads are ignored.
    pub fn observe(&mut self, report: BatchStatusReport) -> TrackerState {
        if self.state.is_terminal() || report.batch_id != self.batch.batch_id {
            return self.state;
        }

        self.polls += 1;
        self.state = if !report.is_ended() {
            TrackerState::Polling
        } else if report.counts.succeeded > 0 {
            TrackerState::TerminalSucceeded
        } else {
            self.failure = Some(FailureReason::NothingSucceeded);
            TrackerState::TerminalFailed
        };
        self.last_report = Some(report);
        self.state
    }

    /// Give up on the batch if the policy deadline has passed.
    ///
    /// Returns `true` if the tracker moved to [`TrackerState::TerminalFailed`].
    pub fn check_deadline(&mut self, policy: &PollPolicy) -> bool {
        self.expire_if_older_than(policy, self.elapsed())
    }

    fn expire_if_older_than(&mut self, policy: &PollPolicy, elapsed: Duration) -> bool {
        if self.state.is_terminal() || elapsed < policy.timeout {
            return false;
        }
        self.state = TrackerState::TerminalFailed;
        self.failure = Some(FailureReason::TimedOut);
        true
    }
}
