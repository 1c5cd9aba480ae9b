//! Campaign generation worker binary.
//!
//! Usage: `adgen-worker <campaign_id>`

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adgen_llm_client::AnthropicClient;
use adgen_models::CampaignId;
use adgen_storage::S3Client;
use adgen_supabase::{CampaignRepository, SupabaseClient};
use adgen_worker::{CampaignPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider was already installed");
    }

    dotenvy::dotenv().ok();

    init_tracing();

    let Some(campaign_id) = std::env::args().nth(1).filter(|s| !s.trim().is_empty()) else {
        eprintln!("usage: adgen-worker <campaign_id>");
        std::process::exit(2);
    };
    let campaign_id = CampaignId::from_string(campaign_id);

    info!(campaign_id = %campaign_id, "Starting adgen-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let anthropic = match AnthropicClient::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create Anthropic client: {}", e);
            std::process::exit(1);
        }
    };

    let campaigns = match SupabaseClient::from_env() {
        Ok(c) => CampaignRepository::new(c),
        Err(e) => {
            error!("Failed to create Supabase client: {}", e);
            std::process::exit(1);
        }
    };

    let store = if config.archive_results {
        match S3Client::from_env().await {
            Ok(s) => Some(s),
            Err(e) => {
                error!("Failed to create S3 client: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("Result archiving disabled");
        None
    };

    let pipeline = CampaignPipeline::new(anthropic.clone(), anthropic, campaigns, store, config);

    match pipeline.run(&campaign_id).await {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to serialize report: {}", e),
        },
        Err(e) => {
            error!(campaign_id = %campaign_id, retryable = e.is_retryable(), "Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,aws_config=warn,aws_smithy_runtime=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
