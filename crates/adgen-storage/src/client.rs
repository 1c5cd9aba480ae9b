//! S3 client implementation.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Configuration for the S3 client.
///
/// Only the bucket is required. Without an explicit endpoint and key pair
/// the default AWS credential chain is used.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name
    pub bucket_name: String,
    /// Region, e.g. `us-east-1`
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    pub endpoint_url: Option<String>,
    /// Static access key ID
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
}

impl S3Config {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            region: None,
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let bucket_name = std::env::var("S3_BUCKET")
            .map_err(|_| StorageError::config_error("S3_BUCKET not set"))?;

        if bucket_name.trim().is_empty() {
            return Err(StorageError::config_error("S3_BUCKET cannot be empty"));
        }

        Ok(Self {
            bucket_name,
            region: std::env::var("S3_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .ok(),
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
        })
    }

    fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret, None, None, "adgen-s3")),
            _ => None,
        }
    }
}

/// S3 storage client bound to one bucket.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let client = match (&config.endpoint_url, config.static_credentials()) {
            (Some(endpoint), Some(credentials)) => {
                let sdk_config = Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .endpoint_url(endpoint)
                    .region(Region::new(
                        config.region.clone().unwrap_or_else(|| "us-east-1".to_string()),
                    ))
                    .credentials_provider(credentials)
                    .force_path_style(true)
                    .build();
                Client::from_conf(sdk_config)
            }
            (endpoint, _) => {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = &config.region {
                    loader = loader.region(aws_types::region::Region::new(region.clone()));
                }
                if let Some(endpoint) = endpoint {
                    loader = loader.endpoint_url(endpoint);
                }
                Client::new(&loader.load().await)
            }
        };

        Ok(Self {
            client,
            bucket: config.bucket_name,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload bytes.
    pub async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Download object as bytes.
    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Serialize a value as pretty JSON and upload it.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(value)?;
        let size = data.len();
        self.upload_bytes(data, key, CONTENT_TYPE_JSON).await?;
        info!(bucket = %self.bucket, key = %key, bytes = size, "Stored JSON object");
        Ok(())
    }

    /// Download and deserialize a JSON object.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<T> {
        let data = self.download_bytes(key).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
