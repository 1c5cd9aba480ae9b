//! Supabase (PostgREST) client.
//!
//! This crate provides:
//! - A thin REST client over `/rest/v1` with service-key auth
//! - Typed campaign repository (read inputs, store generated artifacts)
//! - Retry with exponential backoff and jitter
//! - Request metrics and tracing spans

pub mod campaign_repo;
pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;

pub use campaign_repo::CampaignRepository;
pub use client::{Filter, SupabaseClient, SupabaseConfig};
pub use error::{SupabaseError, SupabaseResult};
pub use retry::{Operation, RetryConfig};
