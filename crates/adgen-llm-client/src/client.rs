//! Anthropic HTTP client.

use std::time::Duration;

use adgen_models::BatchJob;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};

use crate::error::{LlmError, LlmResult};
use crate::jsonl::JsonlDecoder;
use crate::provider::{BatchProvider, MessageProvider};
use crate::types::{BatchResultLine, CreateBatchBody, GenerationRequest, Message, MessageRequest};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Provider limit on requests per batch.
pub const MAX_BATCH_REQUESTS: usize = 100_000;

/// Configuration for the Anthropic client.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (`x-api-key`)
    pub api_key: String,
    /// Base URL of the API
    pub base_url: String,
    /// Value of the `anthropic-version` header
    pub api_version: String,
    /// Request timeout
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a config with default endpoint settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Create config from environment variables.
    ///
    /// `ANTHROPIC_API_KEY` is required.
    pub fn from_env() -> LlmResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::config("ANTHROPIC_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_version: std::env::var("ANTHROPIC_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(
                std::env::var("ANTHROPIC_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        })
    }
}

/// Client for the Anthropic Messages and Message Batches APIs.
#[derive(Clone)]
pub struct AnthropicClient {
    http: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    /// Create a new client. Fails if the API key is empty.
    pub fn new(config: AnthropicConfig) -> LlmResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::config("Anthropic API key is empty"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("adgen-llm-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
    }

    async fn check(response: Response) -> LlmResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::from_http_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl BatchProvider for AnthropicClient {
    async fn create_batch(&self, requests: &[GenerationRequest]) -> LlmResult<BatchJob> {
        if requests.is_empty() {
            return Err(LlmError::invalid_request("batch must contain at least one request"));
        }
        if requests.len() > MAX_BATCH_REQUESTS {
            return Err(LlmError::invalid_request(format!(
                "batch of {} requests exceeds limit of {}",
                requests.len(),
                MAX_BATCH_REQUESTS
            )));
        }

        let url = self.url("/v1/messages/batches");
        debug!("Submitting batch of {} requests to {}", requests.len(), url);

        let response = self
            .authorize(self.http.post(&url))
            .json(&CreateBatchBody { requests })
            .send()
            .await?;

        let job: BatchJob = Self::check(response).await?.json().await?;
        info!(
            batch_id = %job.id,
            request_count = requests.len(),
            "Batch accepted by provider"
        );
        Ok(job)
    }

    async fn retrieve_batch(&self, batch_id: &str) -> LlmResult<BatchJob> {
        let url = self.url(&format!("/v1/messages/batches/{}", batch_id));

        let response = self.authorize(self.http.get(&url)).send().await?;
        let job: BatchJob = Self::check(response).await?.json().await?;
        Ok(job)
    }

    async fn batch_results(&self, batch_id: &str) -> LlmResult<Vec<BatchResultLine>> {
        let url = self.url(&format!("/v1/messages/batches/{}/results", batch_id));

        let response = self.authorize(self.http.get(&url)).send().await?;
        let response = Self::check(response).await?;

        let mut decoder = JsonlDecoder::new();
        let mut lines = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            lines.extend(decoder.push::<BatchResultLine>(&chunk)?);
        }
        if let Some(last) = decoder.finish::<BatchResultLine>()? {
            lines.push(last);
        }

        debug!(batch_id = %batch_id, lines = lines.len(), "Read batch results");
        Ok(lines)
    }
}

#[async_trait]
impl MessageProvider for AnthropicClient {
    async fn create_message(&self, request: &MessageRequest) -> LlmResult<Message> {
        let url = self.url("/v1/messages");

        let response = self
            .authorize(self.http.post(&url))
            .json(request)
            .send()
            .await?;

        let message: Message = Self::check(response).await?.json().await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_defaults() {
        let config = AnthropicConfig::new("sk-test");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.api_version, "2023-06-01");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_key() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        let result = AnthropicConfig::from_env();
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_config_from_env_reads_overrides() {
        std::env::set_var("ANTHROPIC_API_KEY", "sk-env");
        std::env::set_var("ANTHROPIC_BASE_URL", "http://localhost:9999");
        std::env::remove_var("ANTHROPIC_TIMEOUT_SECS");

        let config = AnthropicConfig::from_env().unwrap();
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.base_url, "http://localhost:9999");

        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("ANTHROPIC_BASE_URL");
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let result = AnthropicClient::new(AnthropicConfig::new("  "));
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let mut config = AnthropicConfig::new("sk-test");
        config.base_url = "http://localhost:1234/".to_string();
        let client = AnthropicClient::new(config).unwrap();
        assert_eq!(
            client.url("/v1/messages/batches"),
            "http://localhost:1234/v1/messages/batches"
        );
    }
}
