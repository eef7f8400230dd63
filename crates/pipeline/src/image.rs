//! Image sub-workflow: one checkpointed step that generates the source
//! image, stores it, and links the asset.

use serde::{Deserialize, Serialize};

use reelforge_core::error::CoreError;
use reelforge_core::status::JobStatus;
use reelforge_core::steps::STEP_GENERATE_IMAGE;
use reelforge_core::types::DbId;
use reelforge_db::models::asset::{kinds, CreateAsset};
use reelforge_db::models::job::Job;
use reelforge_db::repositories::{AssetRepo, JobPatch, JobRepo};
use reelforge_providers::ImageRequest;

use crate::step::StepRunner;
use crate::{db_error, download_artifact, PipelineContext};

/// Checkpointed result of the image step.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageStepResult {
    pub asset_id: DbId,
    pub url: String,
}

/// Run the image sub-workflow for a claimed job.
///
/// Re-entry is harmless end to end: the status transition is guarded, the
/// step is checkpointed, and the asset upsert converges on one row.
pub async fn run_image_workflow(
    ctx: &PipelineContext,
    job: &Job,
) -> Result<ImageStepResult, CoreError> {
    JobRepo::mark_started(&ctx.pool, job.id).await.map_err(db_error)?;
    // False just means a previous run already advanced the job.
    JobRepo::transition(&ctx.pool, job.id, JobStatus::Queued, JobStatus::GeneratingImage)
        .await
        .map_err(db_error)?;

    let runner = StepRunner::new(ctx.pool.clone());
    let job_id = job.id;

    runner
        .run(job_id, STEP_GENERATE_IMAGE, |idempotency_key| async move {
            let artifact = ctx
                .providers
                .image()
                .generate(&ImageRequest {
                    prompt: job.prompt.clone(),
                    resolution: job.resolution.clone(),
                    idempotency_key,
                })
                .await?;

            let bytes = download_artifact(&artifact.artifact_url).await?;
            let (width, height) = image_dimensions(&bytes)
                .or(artifact.width.zip(artifact.height))
                .map_or((None, None), |(w, h)| (Some(w), Some(h)));

            let storage_key = format!("images/{job_id}.png");
            let url = ctx.storage.put(&storage_key, bytes, "image/png").await?;

            let asset = AssetRepo::upsert(
                &ctx.pool,
                &CreateAsset {
                    user_id: job.user_id,
                    project_id: job.project_id,
                    job_id,
                    kind: kinds::IMAGE.to_string(),
                    storage_key,
                    url: url.clone(),
                    width,
                    height,
                    duration_secs: None,
                    generated_by: ctx.providers.image().id().to_string(),
                    prompt: job.prompt.clone(),
                },
            )
            .await
            .map_err(db_error)?;

            let patch = JobPatch {
                transition: Some((JobStatus::GeneratingImage, JobStatus::ImageReady)),
                image_asset_id: Some(asset.id),
                ..Default::default()
            };
            Ok((ImageStepResult { asset_id: asset.id, url }, patch))
        })
        .await
}

/// Header-only dimension extraction; `None` when the bytes are not a
/// decodable image format.
fn image_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (w, h) = reader.into_dimensions().ok()?;
    Some((w as i32, h as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_of_a_minimal_png() {
        // 1x1 transparent PNG.
        let png: &[u8] = &[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49,
            0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06,
            0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44,
            0x41, 0x54, 0x78, 0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D,
            0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42,
            0x60, 0x82,
        ];
        assert_eq!(image_dimensions(png), Some((1, 1)));
    }

    #[test]
    fn dimensions_of_garbage_are_none() {
        assert_eq!(image_dimensions(b"not an image"), None);
    }
}
