//! S3 object storage backend.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

use reelforge_core::error::CoreError;

use crate::ObjectStore;

/// S3-backed [`ObjectStore`].
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Base under which uploaded keys are publicly reachable (CDN or
    /// bucket website endpoint).
    public_base_url: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self { client, bucket, public_base_url }
    }

    /// Build from the ambient AWS environment plus `S3_BUCKET` and
    /// `S3_PUBLIC_URL`.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        let client = aws_sdk_s3::Client::new(&config);
        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "reelforge-assets".into());
        let public_base_url = std::env::var("S3_PUBLIC_URL")
            .unwrap_or_else(|_| format!("https://{bucket}.s3.amazonaws.com"));
        Self::new(client, bucket, public_base_url)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, CoreError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| CoreError::Storage(format!("s3 put {key} failed: {e}")))?;

        tracing::debug!(key, size, "Uploaded object to S3");
        Ok(format!("{}/{key}", self.public_base_url.trim_end_matches('/')))
    }
}
