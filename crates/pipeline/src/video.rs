//! Video sub-workflow: submit the external render, wait on it, store the
//! artifact.
//!
//! Split into two checkpointed steps so a transient outage during the wait
//! never re-submits the render; the image cost was checkpointed earlier
//! still and is never re-incurred either.

use serde::{Deserialize, Serialize};

use reelforge_core::error::CoreError;
use reelforge_core::provider::{clamp_duration, VideoProviderId};
use reelforge_core::status::JobStatus;
use reelforge_core::steps::{STEP_AWAIT_VIDEO, STEP_SUBMIT_VIDEO};
use reelforge_core::types::DbId;
use reelforge_db::models::asset::{kinds, CreateAsset};
use reelforge_db::models::job::Job;
use reelforge_db::repositories::{AssetRepo, JobPatch, JobRepo};
use reelforge_providers::{VideoProvider, VideoRequest};

use crate::poller::{wait_for_render, PollConfig, WaitResult};
use crate::step::StepRunner;
use crate::{db_error, download_artifact, PipelineContext};

/// Checkpointed result of the submit step.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitStepResult {
    pub handle: String,
}

/// Checkpointed result of the await step.
#[derive(Debug, Serialize, Deserialize)]
pub struct AwaitStepResult {
    pub video_asset_id: Option<DbId>,
}

/// Run the video sub-workflow for a job whose image is ready.
pub async fn run_video_workflow(
    ctx: &PipelineContext,
    job: &Job,
    poll_config: &PollConfig,
) -> Result<AwaitStepResult, CoreError> {
    let provider_id = VideoProviderId::parse(&job.provider_id).ok_or_else(|| {
        CoreError::Internal(format!("job {} carries unknown provider '{}'", job.id, job.provider_id))
    })?;
    let provider = ctx.providers.video(provider_id)?;

    let image_asset_id = job.image_asset_id.ok_or_else(|| {
        CoreError::Internal(format!("job {} reached video stage without an image", job.id))
    })?;
    let image = AssetRepo::find_by_id(&ctx.pool, image_asset_id)
        .await
        .map_err(db_error)?
        .ok_or(CoreError::NotFound { entity: "asset", id: image_asset_id })?;

    // False just means a previous run already advanced the job.
    JobRepo::transition(&ctx.pool, job.id, JobStatus::ImageReady, JobStatus::GeneratingVideo)
        .await
        .map_err(db_error)?;

    let runner = StepRunner::new(ctx.pool.clone());
    let job_id = job.id;

    let submitted: SubmitStepResult = runner
        .run(job_id, STEP_SUBMIT_VIDEO, |idempotency_key| {
            let provider = provider.clone();
            let image_url = image.url.clone();
            async move {
                let handle = provider
                    .submit(&VideoRequest {
                        prompt: job.prompt.clone(),
                        image_url,
                        duration_secs: clamp_duration(provider_id, job.requested_duration_secs),
                        resolution: job.resolution.clone(),
                        motion: job.motion.clone(),
                        with_audio: job.with_audio && provider.capabilities().supports_audio,
                        idempotency_key,
                    })
                    .await?;

                let patch = JobPatch {
                    provider_job_handle: Some(handle.clone()),
                    ..Default::default()
                };
                Ok((SubmitStepResult { handle }, patch))
            }
        })
        .await?;

    runner
        .run(job_id, STEP_AWAIT_VIDEO, |_idempotency_key| {
            let provider = provider.clone();
            let handle = submitted.handle.clone();
            async move {
                let wait =
                    wait_for_render(&ctx.pool, provider.as_ref(), job_id, &handle, poll_config)
                        .await?;

                match wait {
                    WaitResult::AlreadyApplied { video_asset_id } => {
                        // The webhook did the work; just checkpoint it.
                        Ok((AwaitStepResult { video_asset_id }, JobPatch::default()))
                    }
                    WaitResult::Artifact { artifact_url } => {
                        let bytes = download_artifact(&artifact_url).await?;
                        let storage_key = format!("videos/{job_id}.mp4");
                        let url = ctx.storage.put(&storage_key, bytes, "video/mp4").await?;

                        let asset = AssetRepo::upsert(
                            &ctx.pool,
                            &CreateAsset {
                                user_id: job.user_id,
                                project_id: job.project_id,
                                job_id,
                                kind: kinds::VIDEO.to_string(),
                                storage_key,
                                url,
                                width: None,
                                height: None,
                                duration_secs: Some(clamp_duration(
                                    provider_id,
                                    job.requested_duration_secs,
                                ) as f64),
                                generated_by: provider_id.as_str().to_string(),
                                prompt: job.prompt.clone(),
                            },
                        )
                        .await
                        .map_err(db_error)?;

                        let patch = JobPatch {
                            transition: Some((JobStatus::GeneratingVideo, JobStatus::VideoReady)),
                            video_asset_id: Some(asset.id),
                            ..Default::default()
                        };
                        Ok((AwaitStepResult { video_asset_id: Some(asset.id) }, patch))
                    }
                }
            }
        })
        .await
}
