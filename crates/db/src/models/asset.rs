//! Generated asset entity (images and videos).

use reelforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Asset kinds stored in `assets.kind`.
pub mod kinds {
    pub const IMAGE: &str = "image";
    pub const VIDEO: &str = "video";
}

/// A row from the `assets` table.
///
/// Owned by the job that created it, but deliberately not cascade-deleted
/// on job failure: partial work stays inspectable and reusable.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub user_id: DbId,
    pub project_id: DbId,
    /// Owning job; nulled when the sweeper eventually deletes a failed job
    /// so the asset itself survives.
    pub job_id: Option<DbId>,
    pub kind: String,
    pub storage_key: String,
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
    /// Provider that generated the artifact.
    pub generated_by: String,
    pub prompt: String,
    pub status: String,
    pub created_at: Timestamp,
}

/// Insert payload for a new asset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAsset {
    pub user_id: DbId,
    pub project_id: DbId,
    pub job_id: DbId,
    pub kind: String,
    pub storage_key: String,
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
    pub generated_by: String,
    pub prompt: String,
}
