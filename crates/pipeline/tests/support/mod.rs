//! Shared fixtures for pipeline integration tests: scripted providers, an
//! in-memory object store, and a tiny artifact server.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;

use reelforge_core::error::CoreError;
use reelforge_core::poll::PollOutcome;
use reelforge_core::provider::VideoProviderId;
use reelforge_db::models::job::{CreateJob, Job};
use reelforge_db::models::ledger::entry_types;
use reelforge_db::repositories::{JobRepo, LedgerRepo, ReservationOutcome};
use reelforge_events::EventBus;
use reelforge_pipeline::PipelineContext;
use reelforge_providers::registry::ProviderRegistry;
use reelforge_providers::{
    ImageArtifact, ImageProvider, ImageRequest, VideoProvider, VideoRequest,
};
use reelforge_storage::ObjectStore;

pub const USER: i64 = 1;

/// 1x1 transparent PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
    0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
    0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
    0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
    0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Serve fixed bytes over HTTP so artifact downloads hit a real socket.
/// Returns the base URL.
pub async fn spawn_artifact_server() -> String {
    use axum::routing::get;

    let app = axum::Router::new()
        .route("/image.png", get(|| async { TINY_PNG.to_vec() }))
        .route("/video.mp4", get(|| async { b"fake mp4 bytes".to_vec() }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Scripted providers
// ---------------------------------------------------------------------------

pub struct ScriptedImageProvider {
    pub artifact_url: String,
    pub calls: AtomicU32,
}

#[async_trait]
impl ImageProvider for ScriptedImageProvider {
    fn id(&self) -> &str {
        "prism"
    }

    async fn generate(&self, _request: &ImageRequest) -> Result<ImageArtifact, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ImageArtifact {
            artifact_url: self.artifact_url.clone(),
            width: None,
            height: None,
        })
    }
}

/// Video provider that replays a fixed poll script; the last entry repeats
/// once the script is exhausted.
pub struct ScriptedVideoProvider {
    pub id: VideoProviderId,
    pub script: Mutex<Vec<PollOutcome>>,
    pub submit_calls: AtomicU32,
    pub poll_calls: AtomicU32,
}

impl ScriptedVideoProvider {
    pub fn new(id: VideoProviderId, script: Vec<PollOutcome>) -> Arc<Self> {
        Arc::new(Self {
            id,
            script: Mutex::new(script),
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
        })
    }

    pub fn submits(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoProvider for ScriptedVideoProvider {
    fn id(&self) -> VideoProviderId {
        self.id
    }

    async fn submit(&self, _request: &VideoRequest) -> Result<String, CoreError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        Ok("render-handle-1".to_string())
    }

    async fn poll_status(&self, _handle: &str) -> Result<PollOutcome, CoreError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            Ok(script.remove(0))
        } else {
            Ok(script.first().cloned().unwrap_or(PollOutcome::Pending))
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory object store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, CoreError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("mem://{key}"))
    }
}

// ---------------------------------------------------------------------------
// Context / job helpers
// ---------------------------------------------------------------------------

pub fn context(
    pool: PgPool,
    image: Arc<dyn ImageProvider>,
    video: Arc<dyn VideoProvider>,
) -> PipelineContext {
    PipelineContext {
        pool,
        providers: Arc::new(ProviderRegistry::new(image, vec![video])),
        storage: Arc::new(MemoryStore::default()),
        bus: Arc::new(EventBus::default()),
    }
}

/// Fund the user and create a queued nova job.
pub async fn create_funded_job(pool: &PgPool, prompt: &str, cost_cents: i32) -> Job {
    LedgerRepo::append(pool, USER, cost_cents + 500, entry_types::PURCHASE, "Pack", None)
        .await
        .unwrap();
    let input = CreateJob {
        user_id: USER,
        project_id: 1,
        prompt: prompt.to_string(),
        requested_duration_secs: 20,
        resolution: "720p".to_string(),
        with_audio: false,
        motion: None,
        provider_id: "nova".to_string(),
        cost_cents,
        platforms: vec!["youtube".to_string(), "tiktok".to_string()],
    };
    match JobRepo::create_with_reservation(pool, &input).await.unwrap() {
        ReservationOutcome::Created(job) => job,
        other => panic!("expected creation, got {other:?}"),
    }
}
