//! Async render poller: bridges long-running provider jobs into the step
//! model.
//!
//! The wait is a resumable loop over persisted state, not a blocked thread:
//! every tick re-reads the job (so a webhook that already flipped it
//! short-circuits the wait), refreshes the claim lease, and spends one
//! attempt from a bounded budget. A crash mid-wait loses at most one
//! polling interval: re-entry finds the submit checkpoint and resumes
//! polling the same handle.

use std::time::Duration;

use sqlx::PgPool;

use reelforge_core::error::CoreError;
use reelforge_core::poll::{PollBudget, PollOutcome, MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use reelforge_core::status::JobStatus;
use reelforge_core::types::DbId;
use reelforge_db::repositories::JobRepo;
use reelforge_providers::VideoProvider;

use crate::db_error;

/// Tunable wait parameters. Production uses the defaults; tests shrink the
/// interval to zero.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// How a bounded render wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    /// The poller observed completion; the artifact still needs storing.
    Artifact { artifact_url: String },
    /// A webhook already advanced the job past GENERATING_VIDEO; the video
    /// asset (if the webhook created one) is already linked.
    AlreadyApplied { video_asset_id: Option<DbId> },
}

/// Wait for an external render to finish.
///
/// Returns [`WaitResult::Artifact`] on an observed completion,
/// `Provider` on an external failure, and `Timeout` once the attempt
/// budget is spent, which the caller handles identically to a provider
/// failure.
pub async fn wait_for_render(
    pool: &PgPool,
    provider: &dyn VideoProvider,
    job_id: DbId,
    handle: &str,
    config: &PollConfig,
) -> Result<WaitResult, CoreError> {
    let mut budget = PollBudget::new(config.max_attempts);

    loop {
        // Webhook short-circuit: the job may have moved while we slept.
        let job = JobRepo::find_by_id(pool, job_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound { entity: "job", id: job_id })?;
        match job.status() {
            Some(JobStatus::VideoReady) | Some(JobStatus::Completed) => {
                tracing::info!(job_id, "Render wait short-circuited by webhook");
                return Ok(WaitResult::AlreadyApplied { video_asset_id: job.video_asset_id });
            }
            Some(JobStatus::Failed) => {
                return Err(CoreError::Provider(
                    job.error_message
                        .unwrap_or_else(|| "render failed (reported via webhook)".into()),
                ));
            }
            _ => {}
        }

        if !budget.try_spend() {
            return Err(CoreError::Timeout(format!(
                "render {handle} still pending after {} polls",
                budget.spent()
            )));
        }

        match provider.poll_status(handle).await? {
            PollOutcome::Completed { artifact_url } => {
                tracing::info!(job_id, attempts = budget.spent(), "Render completed");
                return Ok(WaitResult::Artifact { artifact_url });
            }
            PollOutcome::Failed { message } => {
                return Err(CoreError::Provider(message));
            }
            PollOutcome::Pending => {
                JobRepo::touch_claim(pool, job_id).await.map_err(db_error)?;
                tokio::time::sleep(config.interval).await;
            }
        }
    }
}
