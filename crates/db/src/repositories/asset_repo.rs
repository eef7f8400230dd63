//! Repository for the `assets` table.

use reelforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::asset::{Asset, CreateAsset};

/// Column list for `assets` queries.
const COLUMNS: &str = "\
    id, user_id, project_id, job_id, kind, storage_key, url, width, height, \
    duration_secs, generated_by, prompt, status, created_at";

/// Provides CRUD operations for generated assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Insert an asset, or return the existing row if this job already has
    /// one of the same kind.
    ///
    /// A job produces at most one image and one video, enforced by a unique
    /// index on `(job_id, kind)`; crash-and-retry paths therefore converge
    /// on a single row instead of duplicating it.
    pub async fn upsert(pool: &PgPool, input: &CreateAsset) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets \
                 (user_id, project_id, job_id, kind, storage_key, url, width, height, \
                  duration_secs, generated_by, prompt, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'ready') \
             ON CONFLICT (job_id, kind) WHERE job_id IS NOT NULL \
             DO UPDATE SET url = EXCLUDED.url \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(input.user_id)
            .bind(input.project_id)
            .bind(input.job_id)
            .bind(&input.kind)
            .bind(&input.storage_key)
            .bind(&input.url)
            .bind(input.width)
            .bind(input.height)
            .bind(input.duration_secs)
            .bind(&input.generated_by)
            .bind(&input.prompt)
            .fetch_one(pool)
            .await
    }

    /// Find an asset by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All assets linked to one job, oldest first.
    pub async fn list_by_job(pool: &PgPool, job_id: DbId) -> Result<Vec<Asset>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM assets WHERE job_id = $1 ORDER BY created_at ASC");
        sqlx::query_as::<_, Asset>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
