//! Claim loop: matches queued (and lease-expired) jobs with workflow runs.
//!
//! Claims use `SELECT FOR UPDATE SKIP LOCKED`, so any number of worker
//! instances can run this loop without double-dispatch. Each claimed job
//! runs as its own task under a concurrency cap; the workflow itself
//! refreshes the claim lease during long waits, and a crashed instance's
//! jobs come back through `reclaim_stalled` once their lease expires.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use reelforge_db::models::job::Job;
use reelforge_db::repositories::JobRepo;
use reelforge_events::bus::event_types;
use reelforge_events::JobEvent;
use reelforge_pipeline::orchestrator::execute_claimed_job;
use reelforge_pipeline::poller::PollConfig;
use reelforge_pipeline::PipelineContext;

/// How often the claim loop looks for work.
const CLAIM_INTERVAL: Duration = Duration::from_secs(1);

/// A claim older than this on a non-terminal job is considered abandoned.
const CLAIM_LEASE: chrono::Duration = chrono::Duration::minutes(5);

/// Default cap on concurrently running workflows per instance.
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Long-lived claim loop for one worker instance.
pub struct Dispatcher {
    ctx: PipelineContext,
    worker_name: String,
    slots: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(ctx: PipelineContext, worker_name: String) -> Self {
        let max_jobs: usize = std::env::var("MAX_CONCURRENT_JOBS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS);
        Self {
            ctx,
            worker_name,
            slots: Arc::new(Semaphore::new(max_jobs)),
        }
    }

    /// Run the claim loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(CLAIM_INTERVAL);
        tracing::info!(
            worker = %self.worker_name,
            max_jobs = self.slots.available_permits(),
            "Dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker = %self.worker_name, "Dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.try_claim().await {
                        tracing::error!(error = %e, "Claim cycle failed");
                    }
                }
            }
        }
    }

    /// One claim cycle: take a queued job if a slot is free, otherwise a
    /// lease-expired one.
    async fn try_claim(&self) -> Result<(), sqlx::Error> {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            return Ok(());
        };

        let claimed = match JobRepo::claim_next(&self.ctx.pool, &self.worker_name).await? {
            Some(job) => Some(job),
            None => {
                let cutoff = chrono::Utc::now() - CLAIM_LEASE;
                JobRepo::reclaim_stalled(&self.ctx.pool, &self.worker_name, cutoff).await?
            }
        };

        let Some(job) = claimed else {
            return Ok(());
        };

        self.spawn_job(job, permit);
        Ok(())
    }

    fn spawn_job(&self, job: Job, permit: tokio::sync::OwnedSemaphorePermit) {
        tracing::info!(
            job_id = job.id,
            worker = %self.worker_name,
            provider = %job.provider_id,
            "Job claimed",
        );
        self.ctx.bus.publish(
            JobEvent::new(event_types::JOB_CLAIMED, job.id).with_user(job.user_id),
        );

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            execute_claimed_job(&ctx, job.id, &PollConfig::default()).await;
            drop(permit);
        });
    }
}
