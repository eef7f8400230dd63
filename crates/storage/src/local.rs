//! Local-filesystem storage backend for development and tests.

use std::path::PathBuf;

use async_trait::async_trait;

use reelforge_core::error::CoreError;

use crate::ObjectStore;

/// Filesystem-backed [`ObjectStore`]. Objects land under `root/<key>` and
/// are "served" from `base_url/<key>`.
pub struct LocalStore {
    root: PathBuf,
    base_url: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self { root: root.into(), base_url: base_url.into() }
    }

    /// Build from `LOCAL_STORAGE_ROOT` / `LOCAL_STORAGE_URL`.
    pub fn from_env() -> Self {
        let root = std::env::var("LOCAL_STORAGE_ROOT").unwrap_or_else(|_| "./data/assets".into());
        let base_url = std::env::var("LOCAL_STORAGE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/assets".into());
        Self::new(root, base_url)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, CoreError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Storage(format!("mkdir for {key} failed: {e}")))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CoreError::Storage(format!("write {key} failed: {e}")))?;

        Ok(format!("{}/{key}", self.base_url.trim_end_matches('/')))
    }
}
