//! Step checkpoint entity: the durable record behind exactly-once steps.

use reelforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `step_checkpoints` table, keyed by `(job_id, step_name)`.
///
/// Once a checkpoint exists the step is logically done: re-entry returns the
/// stored result without re-running the step body.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepCheckpoint {
    pub job_id: DbId,
    pub step_name: String,
    pub result: serde_json::Value,
    pub created_at: Timestamp,
}
