//! Stuck-job monitor with credit-refund compensation.
//!
//! Runs on a fixed schedule, finds non-terminal jobs whose `started_at`
//! exceeds the staleness threshold, and fails + refunds each inside one
//! transaction. The transaction's terminal-status guard makes repeated
//! sweeps of an already-compensated job a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use reelforge_core::retention::{MONITOR_INTERVAL, STALE_AFTER};
use reelforge_core::status::error_codes;
use reelforge_db::repositories::JobRepo;
use reelforge_events::bus::event_types;
use reelforge_events::{EventBus, JobEvent};

/// Background task that reclaims abandoned jobs.
pub struct StuckJobMonitor {
    pool: PgPool,
    bus: Arc<EventBus>,
    interval: Duration,
    stale_after: chrono::Duration,
}

impl StuckJobMonitor {
    pub fn new(pool: PgPool, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            interval: MONITOR_INTERVAL,
            stale_after: STALE_AFTER,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            stale_after_secs = self.stale_after.num_seconds(),
            "Stuck-job monitor started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Stuck-job monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(0) => tracing::debug!("Monitor sweep: nothing stale"),
                        Ok(n) => tracing::info!(compensated = n, "Monitor sweep compensated stale jobs"),
                        Err(e) => tracing::error!(error = %e, "Monitor sweep failed"),
                    }
                }
            }
        }
    }

    /// One sweep: compensate every stale job. Returns how many jobs this
    /// sweep actually failed + refunded.
    pub async fn sweep(&self) -> Result<u32, sqlx::Error> {
        let cutoff = Utc::now() - self.stale_after;
        let stale = JobRepo::find_stale(&self.pool, cutoff).await?;

        let mut compensated = 0u32;
        for job in stale {
            let message = format!(
                "no progress since {}; exceeded the staleness threshold",
                job.started_at.map_or_else(|| "start".into(), |t| t.to_rfc3339()),
            );
            match JobRepo::fail_with_refund(&self.pool, job.id, error_codes::TIMEOUT, &message)
                .await
            {
                Ok(true) => {
                    compensated += 1;
                    tracing::warn!(
                        job_id = job.id,
                        user_id = job.user_id,
                        refund_cents = job.cost_cents,
                        "Stale job failed and refunded",
                    );
                    self.bus.publish(
                        JobEvent::new(event_types::JOB_FAILED, job.id)
                            .with_user(job.user_id)
                            .with_payload(serde_json::json!({ "error_code": error_codes::TIMEOUT })),
                    );
                    self.bus.publish(
                        JobEvent::new(event_types::JOB_REFUNDED, job.id)
                            .with_user(job.user_id)
                            .with_payload(serde_json::json!({ "amount_cents": job.cost_cents })),
                    );
                }
                // Raced a webhook or another sweep; the guard held.
                Ok(false) => {
                    tracing::debug!(job_id = job.id, "Stale candidate already settled");
                }
                Err(e) => {
                    tracing::error!(job_id = job.id, error = %e, "Compensation failed");
                }
            }
        }
        Ok(compensated)
    }
}
