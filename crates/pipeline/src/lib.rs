//! Generation workflow pipeline.
//!
//! Composes the checkpointed step engine, the image and video
//! sub-workflows, the async render poller, the stuck-job monitor, and the
//! cleanup sweeper. All coordination goes through the store; nothing here
//! holds job state in memory across awaits.

use std::sync::Arc;

use sqlx::PgPool;

use reelforge_core::error::CoreError;
use reelforge_events::EventBus;
use reelforge_providers::registry::ProviderRegistry;
use reelforge_storage::ObjectStore;

pub mod cleanup;
pub mod image;
pub mod monitor;
pub mod orchestrator;
pub mod poller;
pub mod step;
pub mod video;

/// Shared handles every workflow invocation needs.
#[derive(Clone)]
pub struct PipelineContext {
    pub pool: PgPool,
    pub providers: Arc<ProviderRegistry>,
    pub storage: Arc<dyn ObjectStore>,
    pub bus: Arc<EventBus>,
}

/// Map a database failure into the domain taxonomy.
///
/// Store errors are not object-storage errors; they surface as `Internal`
/// and end the current run. The claim lease brings the job back to a
/// worker once the store recovers.
pub(crate) fn db_error(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {e}"))
}

/// Fetch an artifact from a provider-hosted URL.
pub(crate) async fn download_artifact(url: &str) -> Result<Vec<u8>, CoreError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| CoreError::Provider(format!("artifact download failed: {e}")))?;
    if !response.status().is_success() {
        return Err(CoreError::Provider(format!(
            "artifact download returned HTTP {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CoreError::Provider(format!("artifact download failed: {e}")))?;
    Ok(bytes.to_vec())
}
