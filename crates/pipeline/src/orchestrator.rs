//! Composite workflow: image sub-workflow, bounded wait, video
//! sub-workflow, finalize.
//!
//! The whole invocation is retried here on transient errors; checkpoints
//! make re-entry cheap, so a video-provider outage never re-incurs the
//! image cost. On a terminal error the job is failed *and* compensated in
//! one transaction. Produced assets stay linked either way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use reelforge_core::error::CoreError;
use reelforge_core::publish::{generate_metadata, Platform};
use reelforge_core::status::JobStatus;
use reelforge_core::steps::STEP_FINALIZE;
use reelforge_core::types::DbId;
use reelforge_db::models::job::Job;
use reelforge_db::repositories::{JobPatch, JobRepo};
use reelforge_events::bus::event_types;
use reelforge_events::JobEvent;

use crate::image::run_image_workflow;
use crate::poller::PollConfig;
use crate::step::StepRunner;
use crate::video::run_video_workflow;
use crate::{db_error, PipelineContext};

/// Whole-workflow retry budget for transient errors.
pub const MAX_WORKFLOW_ATTEMPTS: u32 = 3;

/// Bounded wait for the image stage to settle in the store.
const IMAGE_WAIT_ATTEMPTS: u32 = 20;
const IMAGE_WAIT_INTERVAL: Duration = Duration::from_millis(500);

/// Checkpointed result of the finalize step.
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeResult {
    pub title: String,
}

/// One end-to-end attempt at a generation job.
///
/// Safe to re-enter at any point: every stage short-circuits on its
/// checkpoint or guarded transition.
pub async fn run_generation(
    ctx: &PipelineContext,
    job_id: DbId,
    poll_config: &PollConfig,
) -> Result<(), CoreError> {
    let job = fetch_job(ctx, job_id).await?;
    if job.is_terminal() {
        tracing::debug!(job_id, "Job already terminal; nothing to run");
        return Ok(());
    }

    run_image_workflow(ctx, &job).await?;
    wait_for_image_ready(ctx, job_id).await?;

    // Re-read: the image workflow linked the asset.
    let job = fetch_job(ctx, job_id).await?;
    run_video_workflow(ctx, &job, poll_config).await?;

    finalize(ctx, &job).await?;

    ctx.bus.publish(
        JobEvent::new(event_types::JOB_COMPLETED, job_id).with_user(job.user_id),
    );
    Ok(())
}

/// Run a claimed job to a terminal outcome: retry transient failures up to
/// [`MAX_WORKFLOW_ATTEMPTS`], then fail + refund.
pub async fn execute_claimed_job(ctx: &PipelineContext, job_id: DbId, poll_config: &PollConfig) {
    let mut attempt = 1u32;
    let error = loop {
        match run_generation(ctx, job_id, poll_config).await {
            Ok(()) => return,
            Err(e) if e.is_transient() && attempt < MAX_WORKFLOW_ATTEMPTS => {
                tracing::warn!(
                    job_id,
                    attempt,
                    error = %e,
                    "Workflow attempt failed; re-entering from last checkpoint"
                );
                attempt += 1;
            }
            Err(e) => break e,
        }
    };

    tracing::error!(job_id, attempt, error = %error, "Workflow failed terminally");

    match JobRepo::fail_with_refund(&ctx.pool, job_id, error.code(), &error.to_string()).await {
        Ok(true) => {
            ctx.bus.publish(
                JobEvent::new(event_types::JOB_FAILED, job_id)
                    .with_payload(serde_json::json!({ "error_code": error.code() })),
            );
            ctx.bus.publish(JobEvent::new(event_types::JOB_REFUNDED, job_id));
        }
        Ok(false) => {
            tracing::debug!(job_id, "Job already settled; no compensation needed");
        }
        Err(e) => {
            // The claim lease will bring the job back to a worker.
            tracing::error!(job_id, error = %e, "Failed to record job failure");
        }
    }
}

async fn fetch_job(ctx: &PipelineContext, job_id: DbId) -> Result<Job, CoreError> {
    JobRepo::find_by_id(&ctx.pool, job_id)
        .await
        .map_err(db_error)?
        .ok_or(CoreError::NotFound { entity: "job", id: job_id })
}

/// Bounded poll against the store until the image stage has settled.
async fn wait_for_image_ready(ctx: &PipelineContext, job_id: DbId) -> Result<(), CoreError> {
    for _ in 0..IMAGE_WAIT_ATTEMPTS {
        let job = fetch_job(ctx, job_id).await?;
        match job.status() {
            Some(JobStatus::ImageReady)
            | Some(JobStatus::GeneratingVideo)
            | Some(JobStatus::VideoReady)
            | Some(JobStatus::Completed) => return Ok(()),
            Some(JobStatus::Failed) => {
                return Err(CoreError::Internal(format!(
                    "job {job_id} failed during the image stage"
                )));
            }
            _ => tokio::time::sleep(IMAGE_WAIT_INTERVAL).await,
        }
    }
    Err(CoreError::Timeout(format!(
        "job {job_id} image stage did not settle within the wait bound"
    )))
}

/// Publish-metadata generation plus completion bookkeeping, checkpointed.
async fn finalize(ctx: &PipelineContext, job: &Job) -> Result<FinalizeResult, CoreError> {
    let runner = StepRunner::new(ctx.pool.clone());
    let job_id = job.id;

    runner
        .run(job_id, STEP_FINALIZE, |_idempotency_key| async move {
            let platforms: Vec<Platform> = job
                .provider_data
                .get("platforms")
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|p| p.as_str().and_then(Platform::parse))
                        .collect()
                })
                .unwrap_or_default();

            let metadata = generate_metadata(&job.prompt, &platforms);
            let title = metadata.title.clone();

            let patch = JobPatch {
                transition: Some((JobStatus::VideoReady, JobStatus::Completed)),
                provider_data: Some(serde_json::json!({ "publish_metadata": metadata })),
                mark_completed: true,
                ..Default::default()
            };
            Ok((FinalizeResult { title }, patch))
        })
        .await
}
