//! PostgREST call metrics, labelled by operation and table.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::error::SupabaseError;
use crate::retry::Operation;

pub mod names {
    pub const REQUESTS_TOTAL: &str = "adgen_supabase_requests_total";
    pub const RETRIES_TOTAL: &str = "adgen_supabase_retries_total";
    pub const ROWS_TOTAL: &str = "adgen_supabase_rows_total";
    pub const DURATION_SECONDS: &str = "adgen_supabase_request_duration_seconds";
}

/// Record a finished call, retries included.
pub fn record_request(operation: Operation, table: &str, status: u16, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.as_str(),
        "table" => table.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::DURATION_SECONDS,
        "operation" => operation.as_str(),
        "table" => table.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record rows returned by a select or touched by a write.
pub fn record_rows(operation: Operation, table: &str, rows: usize) {
    counter!(
        names::ROWS_TOTAL,
        "operation" => operation.as_str(),
        "table" => table.to_string()
    )
    .increment(rows as u64);
}

pub fn record_retry(operation: Operation, table: &str, error: &SupabaseError) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.as_str(),
        "table" => table.to_string(),
        "reason" => retry_reason(error)
    )
    .increment(1);
}

/// Low-cardinality label for a retried error.
fn retry_reason(error: &SupabaseError) -> &'static str {
    match error {
        SupabaseError::RateLimited(_) => "rate_limited",
        SupabaseError::ServerError(..) => "server_error",
        SupabaseError::Network(e) if e.is_connect() => "connect",
        SupabaseError::Network(e) if e.is_timeout() => "timeout",
        SupabaseError::Network(_) => "network",
        _ => "other",
    }
}
