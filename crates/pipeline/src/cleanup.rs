//! Retention sweeper for terminal records.
//!
//! Deletes failed jobs past their retention window (checkpoints cascade,
//! assets are kept with `job_id` nulled) and webhook events that never
//! matched a job. Touches only already-settled rows, so it is safe to run
//! concurrently with the monitor.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use reelforge_core::retention::{
    FAILED_JOB_RETENTION, ORPHAN_WEBHOOK_RETENTION, SWEEP_INTERVAL,
};
use reelforge_db::repositories::{JobRepo, WebhookEventRepo};

/// Background retention/garbage-collection task.
pub struct CleanupSweeper {
    pool: PgPool,
    interval: Duration,
}

impl CleanupSweeper {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, interval: SWEEP_INTERVAL }
    }

    /// Run the daily sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(interval_secs = self.interval.as_secs(), "Cleanup sweeper started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Cleanup sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok((jobs, webhooks)) if jobs + webhooks > 0 => {
                            tracing::info!(jobs, webhooks, "Cleanup sweep purged old rows");
                        }
                        Ok(_) => tracing::debug!("Cleanup sweep: nothing to purge"),
                        Err(e) => tracing::error!(error = %e, "Cleanup sweep failed"),
                    }
                }
            }
        }
    }

    /// One sweep. Returns `(failed_jobs_deleted, webhook_events_deleted)`.
    pub async fn sweep(&self) -> Result<(u64, u64), sqlx::Error> {
        let now = Utc::now();

        let jobs = JobRepo::delete_failed_older_than(&self.pool, now - FAILED_JOB_RETENTION).await?;
        let webhooks =
            WebhookEventRepo::delete_orphaned_older_than(&self.pool, now - ORPHAN_WEBHOOK_RETENTION)
                .await?;

        Ok((jobs, webhooks))
    }
}
