//! Workflow metrics.

use metrics::{counter, histogram};

use crate::submission::Stage;

pub mod names {
    /// Batch submissions by stage and outcome.
    pub const BATCHES_SUBMITTED_TOTAL: &str = "adgen_batches_submitted_total";

    /// Individual generation requests submitted, by stage.
    pub const REQUESTS_SUBMITTED_TOTAL: &str = "adgen_requests_submitted_total";

    /// Retrieved batch items by stage and outcome.
    pub const ITEMS_RETRIEVED_TOTAL: &str = "adgen_items_retrieved_total";

    /// Wall time from submission to terminal status.
    pub const BATCH_WAIT_SECONDS: &str = "adgen_batch_wait_seconds";
}

pub fn record_submission(stage: Stage, request_count: usize, ok: bool) {
    counter!(
        names::BATCHES_SUBMITTED_TOTAL,
        "stage" => stage.as_str(),
        "outcome" => if ok { "accepted" } else { "rejected" }
    )
    .increment(1);

    if ok {
        counter!(names::REQUESTS_SUBMITTED_TOTAL, "stage" => stage.as_str())
            .increment(request_count as u64);
    }
}

pub fn record_items(stage: &str, outcome: &'static str, count: usize) {
    if count == 0 {
        return;
    }
    counter!(
        names::ITEMS_RETRIEVED_TOTAL,
        "stage" => stage.to_string(),
        "outcome" => outcome
    )
    .increment(count as u64);
}

pub fn record_wait(stage: Stage, seconds: f64) {
    histogram!(names::BATCH_WAIT_SECONDS, "stage" => stage.as_str()).record(seconds);
}
