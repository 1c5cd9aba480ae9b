//! Ad campaign generation worker.
//!
//! This crate provides:
//! - Prompt rendering from campaign research
//! - Hook and script batch submission against an injected provider
//! - Batch status reads and a lifecycle state machine
//! - Result retrieval and classification
//! - The end-to-end campaign pipeline driven by the `adgen-worker` binary

pub mod angles;
pub mod config;
pub mod error;
pub mod hook_stage;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod poller;
pub mod prompt;
pub mod results;
pub mod script_stage;
pub mod submission;

#[cfg(test)]
pub(crate) mod testing;

pub use angles::{generate_angles, parse_angles};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use hook_stage::{build_hook_requests, submit_hooks};
pub use logging::WorkflowLogger;
pub use pipeline::{wait_for_completion, CampaignPipeline, PipelineReport};
pub use poller::{check_status, BatchStatusReport, BatchTracker, FailureReason, PollPolicy, TrackerState};
pub use prompt::{render, PromptInput, PromptTemplate, PLACEHOLDER};
pub use results::{classify, fetch_ended_results, retrieve_results, RetrievalOutcome, RetrievalSummary};
pub use script_stage::{build_script_requests, hooks_from_stored, submit_scripts};
pub use submission::{submit_batch, GenerationContext, Stage, SubmittedBatch};
