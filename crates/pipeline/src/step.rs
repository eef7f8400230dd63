//! Checkpointed step execution.
//!
//! A step runs exactly once logically: if its checkpoint row already exists
//! the stored result is returned without executing the body, otherwise the
//! body runs and its result plus job-state patch are persisted in one
//! transaction before the engine proceeds. Bodies receive an idempotency
//! key derived from `(job_id, step_name)` for any external call they make,
//! so re-execution after a crash never double-charges or double-creates
//! provider resources.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

use reelforge_core::error::CoreError;
use reelforge_core::steps::idempotency_key;
use reelforge_core::types::DbId;
use reelforge_db::repositories::{CheckpointRepo, JobPatch, JobRepo};

use crate::db_error;

/// Runs named steps against one job with checkpoint short-circuiting.
pub struct StepRunner {
    pool: PgPool,
}

impl StepRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Execute `body` unless a checkpoint for `(job_id, step_name)` exists.
    ///
    /// The body returns its serializable result plus the [`JobPatch`] to
    /// apply with the checkpoint. A patch whose guarded transition no
    /// longer holds (another actor moved the job mid-step) rolls the whole
    /// persist back and surfaces `Conflict`; the retry path re-enters and
    /// observes the other actor's outcome instead.
    pub async fn run<T, F, Fut>(
        &self,
        job_id: DbId,
        step_name: &str,
        body: F,
    ) -> Result<T, CoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<(T, JobPatch), CoreError>>,
    {
        if let Some(checkpoint) = CheckpointRepo::find(&self.pool, job_id, step_name)
            .await
            .map_err(db_error)?
        {
            tracing::debug!(job_id, step_name, "Checkpoint hit; returning cached result");
            return serde_json::from_value(checkpoint.result).map_err(|e| {
                CoreError::Internal(format!(
                    "checkpoint for step '{step_name}' does not deserialize: {e}"
                ))
            });
        }

        let (result, patch) = body(idempotency_key(job_id, step_name)).await?;

        let value = serde_json::to_value(&result).map_err(|e| {
            CoreError::Internal(format!("step '{step_name}' result does not serialize: {e}"))
        })?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let applied = JobRepo::apply_patch_tx(&mut tx, job_id, &patch)
            .await
            .map_err(db_error)?;
        if !applied {
            tx.rollback().await.map_err(db_error)?;
            return Err(CoreError::Conflict(format!(
                "job {job_id} changed concurrently during step '{step_name}'"
            )));
        }
        CheckpointRepo::record_tx(&mut tx, job_id, step_name, &value)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        tracing::info!(job_id, step_name, "Step completed and checkpointed");
        Ok(result)
    }
}
