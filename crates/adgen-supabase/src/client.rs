//! Supabase REST (PostgREST) client.
//!
//! - Service-key authentication (`apikey` + bearer)
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter on transient failures
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{SupabaseError, SupabaseResult};
use crate::metrics::{record_request, record_rows};
use crate::retry::{with_retry, Operation, RetryConfig};

// =============================================================================
// Configuration
// =============================================================================

/// Supabase client configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service role key
    pub service_key: String,
    /// Postgres schema exposed through PostgREST
    pub schema: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_key: service_key.into(),
            schema: "public".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| SupabaseError::config_error("SUPABASE_URL must be set"))?;

        let service_key = std::env::var("SUPABASE_SERVICE_KEY")
            .or_else(|_| std::env::var("SUPABASE_KEY"))
            .map_err(|_| {
                SupabaseError::config_error("SUPABASE_SERVICE_KEY or SUPABASE_KEY must be set")
            })?;

        if url.is_empty() || service_key.is_empty() {
            return Err(SupabaseError::config_error(
                "SUPABASE_URL and SUPABASE_SERVICE_KEY cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("SUPABASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            url,
            service_key,
            schema: std::env::var("SUPABASE_SCHEMA").unwrap_or_else(|_| "public".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

// =============================================================================
// Filters
// =============================================================================

/// A PostgREST horizontal filter, rendered as `column=op.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    op: &'static str,
    value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            op: "eq",
            value: value.to_string(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            op: "lt",
            value: value.to_string(),
        }
    }

    fn to_query(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op, self.value))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Supabase REST client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
    rest_url: String,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    pub fn new(config: SupabaseConfig) -> SupabaseResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("adgen-supabase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SupabaseError::Network)?;

        let rest_url = format!("{}/rest/v1", config.url.trim_end_matches('/'));

        Ok(Self {
            http,
            config,
            rest_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .header("Accept-Profile", &self.config.schema)
            .header("Content-Profile", &self.config.schema)
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Select all rows matching the filters.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> SupabaseResult<Vec<T>> {
        let url = self.table_url(table);
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        query.extend(filters.iter().map(Filter::to_query));

        let (url, query) = (&url, &query);

        let rows: Vec<T> = self
            .execute_request(Operation::Select, table, async {
                with_retry(&self.config.retry, Operation::Select, table, move || async move {
                    let response = self
                        .authorize(self.http.get(url))
                        .query(query)
                        .send()
                        .await?;

                    match response.status() {
                        StatusCode::OK => Ok(response.json::<Vec<T>>().await?),
                        status => Err(Self::handle_error_response(status, url, response).await),
                    }
                })
                .await
            })
            .await?;

        record_rows(Operation::Select, table, rows.len());
        Ok(rows)
    }

    /// Select at most one row matching the filters.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> SupabaseResult<Option<T>> {
        let rows: Vec<T> = self.select(table, filters).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a row and return its stored representation.
    pub async fn insert<T, R>(&self, table: &str, row: &T) -> SupabaseResult<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.table_url(table);
        let url = &url;

        let stored = self
            .execute_request(Operation::Insert, table, async {
                with_retry(&self.config.retry, Operation::Insert, table, move || async move {
                    let response = self
                        .authorize(self.http.post(url))
                        .header("Prefer", "return=representation")
                        .json(row)
                        .send()
                        .await?;

                    match response.status() {
                        StatusCode::OK | StatusCode::CREATED => {
                            let rows: Vec<R> = response.json().await?;
                            rows.into_iter().next().ok_or_else(|| {
                                SupabaseError::InvalidResponse(format!("insert into {} returned no rows", table))
                            })
                        }
                        status => Err(Self::handle_error_response(status, url, response).await),
                    }
                })
                .await
            })
            .await?;

        record_rows(Operation::Insert, table, 1);
        Ok(stored)
    }

    /// Patch every row matching the filters. Returns the number of rows updated.
    pub async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: &serde_json::Value,
    ) -> SupabaseResult<usize> {
        if filters.is_empty() {
            return Err(SupabaseError::request_failed(format!(
                "refusing unfiltered update of {}",
                table
            )));
        }

        let url = self.table_url(table);
        let query: Vec<(String, String)> = filters.iter().map(Filter::to_query).collect();

        let (url, query) = (&url, &query);

        let updated = self
            .execute_request(Operation::Update, table, async {
                with_retry(&self.config.retry, Operation::Update, table, move || async move {
                    let response = self
                        .authorize(self.http.patch(url))
                        .header("Prefer", "return=representation")
                        .query(query)
                        .json(patch)
                        .send()
                        .await?;

                    match response.status() {
                        StatusCode::OK => {
                            let rows: Vec<serde_json::Value> = response.json().await?;
                            Ok(rows.len())
                        }
                        StatusCode::NO_CONTENT => Ok(0),
                        status => Err(Self::handle_error_response(status, url, response).await),
                    }
                })
                .await
            })
            .await?;

        record_rows(Operation::Update, table, updated);
        Ok(updated)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn execute_request<T, F>(&self, operation: Operation, table: &str, fut: F) -> SupabaseResult<T>
    where
        F: std::future::Future<Output = SupabaseResult<T>>,
    {
        let span = info_span!("supabase_request", operation = operation.as_str(), table = %table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let elapsed = start.elapsed();

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, table, status, elapsed);
        debug!(
            operation = operation.as_str(),
            table = %table,
            status,
            latency_ms = elapsed.as_millis() as u64,
            "Supabase request finished"
        );

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> SupabaseError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return SupabaseError::RateLimited(retry_after_ms);
        }

        let body = response.text().await.unwrap_or_default();
        SupabaseError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

// =============================================================================
// Tests
// =============================================================================
