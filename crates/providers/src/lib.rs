//! External AI provider clients.
//!
//! Each backend sits behind a small trait so orchestration code never
//! branches on provider identity; the concrete client is looked up through
//! [`registry::ProviderRegistry`] keyed by the core capability table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reelforge_core::error::CoreError;
use reelforge_core::poll::PollOutcome;
use reelforge_core::provider::{video_caps, VideoCaps, VideoProviderId};

pub mod client;
pub mod registry;

/// Request for a synchronous image generation.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub resolution: String,
    /// Disambiguates retries of the same step on the provider side.
    pub idempotency_key: String,
}

/// Result of a synchronous image generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageArtifact {
    pub artifact_url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Request to start an asynchronous video render.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRequest {
    pub prompt: String,
    /// Source image driving the render.
    pub image_url: String,
    pub duration_secs: i32,
    pub resolution: String,
    pub motion: Option<String>,
    pub with_audio: bool,
    /// Disambiguates retries of the same step on the provider side.
    pub idempotency_key: String,
}

/// Synchronous image generation backend.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Generate an image and return a reference to the artifact.
    async fn generate(&self, request: &ImageRequest) -> Result<ImageArtifact, CoreError>;
}

/// Asynchronous video render backend.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn id(&self) -> VideoProviderId;

    /// Static capability row for this backend.
    fn capabilities(&self) -> &'static VideoCaps {
        video_caps(self.id())
    }

    /// Start a render; returns the provider's job handle.
    async fn submit(&self, request: &VideoRequest) -> Result<String, CoreError>;

    /// One status poll for a previously submitted render.
    async fn poll_status(&self, handle: &str) -> Result<PollOutcome, CoreError>;
}
