//! Strategy table mapping provider ids to live clients.

use std::collections::HashMap;
use std::sync::Arc;

use reelforge_core::error::CoreError;
use reelforge_core::provider::{all_video_caps, VideoProviderId, IMAGE_PROVIDER};

use crate::client::{HttpImageProvider, HttpVideoProvider, ProviderEndpoint};
use crate::{ImageProvider, VideoProvider};

/// Lookup table the orchestrator resolves providers through.
///
/// Built once at startup and shared via `Arc`. Orchestration code holds a
/// [`VideoProviderId`] (from the job row) and never touches a concrete
/// client type.
pub struct ProviderRegistry {
    image: Arc<dyn ImageProvider>,
    video: HashMap<VideoProviderId, Arc<dyn VideoProvider>>,
}

impl ProviderRegistry {
    pub fn new(
        image: Arc<dyn ImageProvider>,
        video_providers: Vec<Arc<dyn VideoProvider>>,
    ) -> Self {
        let video = video_providers.into_iter().map(|p| (p.id(), p)).collect();
        Self { image, video }
    }

    /// Build HTTP clients for the whole fleet from environment settings.
    ///
    /// Endpoints come from `{PROVIDER}_API_URL` / `{PROVIDER}_API_KEY`
    /// (e.g. `NOVA_API_URL`).
    pub fn from_env() -> Self {
        let image: Arc<dyn ImageProvider> = Arc::new(HttpImageProvider::new(
            IMAGE_PROVIDER,
            ProviderEndpoint::from_env(&IMAGE_PROVIDER.to_uppercase()),
        ));

        let video = all_video_caps()
            .iter()
            .map(|caps| {
                let endpoint = ProviderEndpoint::from_env(&caps.id.as_str().to_uppercase());
                Arc::new(HttpVideoProvider::new(caps.id, endpoint)) as Arc<dyn VideoProvider>
            })
            .collect();

        Self::new(image, video)
    }

    pub fn image(&self) -> &Arc<dyn ImageProvider> {
        &self.image
    }

    /// Resolve a video client. Missing entries mean the registry was built
    /// without the full fleet, which is a deployment bug, not user input.
    pub fn video(&self, id: VideoProviderId) -> Result<Arc<dyn VideoProvider>, CoreError> {
        self.video
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::Internal(format!("no client registered for provider {id}")))
    }
}
