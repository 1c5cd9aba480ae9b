//! S3 artifact store.
//!
//! This crate provides:
//! - Byte and JSON upload/download against a single bucket
//! - Object keys for archived batch results

pub mod archive;
pub mod client;
pub mod error;

pub use archive::{batch_results_key, campaign_prefix, ArchivedBatch};
pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
