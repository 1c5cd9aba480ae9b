//! Retry of PostgREST calls.
//!
//! Selects and patches are idempotent and retry on any transient failure.
//! An insert only retries when the row cannot have been written: the
//! connection was never established or the gateway rate limited the call.
//! A patch that matched no rows is a result, not a failure, and is never
//! retried.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::{SupabaseError, SupabaseResult};
use crate::metrics::record_retry;

/// Kind of PostgREST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
        }
    }

    /// Repeating the call leaves the table in the same state.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Operation::Insert)
    }

    /// Whether a failed call may be sent again.
    pub fn should_retry(&self, error: &SupabaseError) -> bool {
        if self.is_idempotent() {
            error.is_retryable()
        } else {
            error.is_unsent()
        }
    }
}

/// Backoff settings.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry
    pub base_delay: Duration,
    /// Upper bound of the exponential backoff
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Read `SUPABASE_RETRY_MAX`, `SUPABASE_RETRY_BASE_MS` and `SUPABASE_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_or("SUPABASE_RETRY_MAX", defaults.max_retries),
            base_delay: Duration::from_millis(env_or(
                "SUPABASE_RETRY_BASE_MS",
                defaults.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(env_or(
                "SUPABASE_RETRY_MAX_MS",
                defaults.max_delay.as_millis() as u64,
            )),
        }
    }

    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `retry` (0-based).
    ///
    /// A server hint wins. Otherwise the delay doubles per retry up to
    /// `max_delay`, and the upper half of it is jittered.
    fn backoff(&self, retry: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint;
        }

        let factor = 2u32.saturating_pow(retry);
        let ceiling = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let half = ceiling / 2;
        half + half.mul_f64(jitter())
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Pseudo-random factor in `[0, 1)` from the clock's sub-second nanos.
fn jitter() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1_000) / 1_000.0
}

/// Run `op` until it succeeds, fails permanently, or runs out of retries.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: Operation,
    table: &str,
    op: F,
) -> SupabaseResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = SupabaseResult<T>>,
{
    let mut retry = 0;

    loop {
        match op().await {
            Ok(value) => {
                if retry > 0 {
                    debug!(operation = operation.as_str(), table, retries = retry, "PostgREST call recovered");
                }
                return Ok(value);
            }
            Err(e) if retry < config.max_retries && operation.should_retry(&e) => {
                let delay = config.backoff(retry, e.retry_after());
                warn!(
                    operation = operation.as_str(),
                    table,
                    retry = retry + 1,
                    delay_ms = delay.as_millis() as u64,
                    "PostgREST call failed, retrying: {}",
                    e
                );

                record_retry(operation, table, &e);
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_backoff_prefers_server_hint() {
        let delay = RetryConfig::default().backoff(0, Some(Duration::from_secs(2)));
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_stays_within_half_and_cap() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(400),
            max_delay: Duration::from_millis(1_000),
        };

        let first = config.backoff(0, None);
        assert!(first >= Duration::from_millis(200) && first <= Duration::from_millis(400));

        let late = config.backoff(10, None);
        assert!(late >= Duration::from_millis(500) && late <= Duration::from_millis(1_000));
    }

    #[test]
    fn test_insert_only_retries_unsent_calls() {
        assert!(Operation::Insert.should_retry(&SupabaseError::RateLimited(100)));
        assert!(!Operation::Insert.should_retry(&SupabaseError::ServerError(503, "down".into())));
        assert!(Operation::Update.should_retry(&SupabaseError::ServerError(503, "down".into())));
        assert!(Operation::Select.should_retry(&SupabaseError::RateLimited(100)));
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);

        let result: SupabaseResult<()> = with_retry(&quick(), Operation::Select, "campaigns", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SupabaseError::not_found("campaigns")) }
        })
        .await;

        assert!(matches!(result, Err(SupabaseError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_idempotent_call() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&quick(), Operation::Update, "campaigns", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(SupabaseError::ServerError(503, "unavailable".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result: SupabaseResult<()> = with_retry(&quick(), Operation::Select, "campaigns", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SupabaseError::ServerError(502, "bad gateway".into())) }
        })
        .await;

        assert!(matches!(result, Err(SupabaseError::ServerError(502, _))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_with_retry_never_repeats_failed_insert() {
        let calls = AtomicU32::new(0);

        let result: SupabaseResult<()> = with_retry(&quick(), Operation::Insert, "campaigns", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SupabaseError::ServerError(500, "statement timeout".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
