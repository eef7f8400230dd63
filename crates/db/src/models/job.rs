//! Generation job entity and DTOs.

use reelforge_core::status::JobStatus;
use reelforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub user_id: DbId,
    pub project_id: DbId,
    pub status_id: i16,
    pub prompt: String,
    pub requested_duration_secs: i32,
    pub resolution: String,
    pub with_audio: bool,
    pub motion: Option<String>,
    pub provider_id: String,
    pub provider_job_handle: Option<String>,
    /// Opaque provider/workflow key-value data (publish metadata lands here
    /// under `publish_metadata`).
    pub provider_data: serde_json::Value,
    /// Cost reserved at creation via a `usage` ledger entry.
    pub cost_cents: i32,
    pub image_asset_id: Option<DbId>,
    pub video_asset_id: Option<DbId>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub processing_time_ms: Option<i64>,
    pub claimed_at: Option<Timestamp>,
    pub claimed_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Typed view of `status_id`. `None` only if the row predates the
    /// current status table, which the migrations make impossible.
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_id(self.status_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(|s| s.is_terminal())
    }
}

/// Insert payload for a new job. The API builds this after validation,
/// provider selection, and pricing.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub user_id: DbId,
    pub project_id: DbId,
    pub prompt: String,
    pub requested_duration_secs: i32,
    pub resolution: String,
    pub with_audio: bool,
    pub motion: Option<String>,
    pub provider_id: String,
    pub cost_cents: i32,
    /// Publishing destinations, stored under `provider_data.platforms` and
    /// consumed by the finalize step.
    pub platforms: Vec<String>,
}
