//! Repository for the `step_checkpoints` table.

use reelforge_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::checkpoint::StepCheckpoint;

/// Column list for `step_checkpoints` queries.
const COLUMNS: &str = "job_id, step_name, result, created_at";

/// Provides checkpoint lookup and recording for the step engine.
pub struct CheckpointRepo;

impl CheckpointRepo {
    /// Fetch the checkpoint for `(job_id, step_name)`, if the step already
    /// ran to completion.
    pub async fn find(
        pool: &PgPool,
        job_id: DbId,
        step_name: &str,
    ) -> Result<Option<StepCheckpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM step_checkpoints WHERE job_id = $1 AND step_name = $2"
        );
        sqlx::query_as::<_, StepCheckpoint>(&query)
            .bind(job_id)
            .bind(step_name)
            .fetch_optional(pool)
            .await
    }

    /// Record a checkpoint inside the caller's transaction.
    ///
    /// `ON CONFLICT DO NOTHING` keeps a concurrent duplicate run harmless:
    /// the first writer wins and the step stays logically once-only.
    pub async fn record_tx(
        conn: &mut PgConnection,
        job_id: DbId,
        step_name: &str,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO step_checkpoints (job_id, step_name, result) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (job_id, step_name) DO NOTHING",
        )
        .bind(job_id)
        .bind(step_name)
        .bind(result)
        .execute(conn)
        .await?;
        Ok(())
    }
}
