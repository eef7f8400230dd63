//! Object storage for generated binaries.
//!
//! One trait, two backends: S3 for deployments, the local filesystem for
//! development and tests. The pipeline only ever sees the trait.

use async_trait::async_trait;

use reelforge_core::error::CoreError;

pub mod local;
pub mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

/// Write-once blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL.
    ///
    /// Keys are deterministic per job/kind, so a retried step overwrites
    /// its own previous upload instead of accumulating blobs.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, CoreError>;
}

/// Pick a backend from `STORAGE_BACKEND` (`s3` or `local`, default local).
pub async fn from_env() -> Result<Box<dyn ObjectStore>, CoreError> {
    let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
    match backend.as_str() {
        "s3" => Ok(Box::new(S3Store::from_env().await)),
        "local" => Ok(Box::new(LocalStore::from_env())),
        other => Err(CoreError::Internal(format!(
            "unknown STORAGE_BACKEND '{other}'; expected s3 or local"
        ))),
    }
}
