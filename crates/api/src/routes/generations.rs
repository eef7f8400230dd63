//! Trigger surface: create and inspect generation jobs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use reelforge_core::provider::{
    job_cost_cents, select_provider, validate_request, video_caps, MotionIntensity, Resolution,
    VideoProviderId,
};
use reelforge_core::types::DbId;
use reelforge_db::models::asset::Asset;
use reelforge_db::models::job::{CreateJob, Job};
use reelforge_db::repositories::{AssetRepo, JobRepo, LedgerRepo, ReservationOutcome};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/generations`.
///
/// Authentication lives in front of this service; the caller identity
/// arrives resolved as `user_id`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGenerationRequest {
    pub user_id: DbId,
    pub project_id: DbId,
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    pub duration_secs: i32,
    pub resolution: String,
    #[serde(default)]
    pub with_audio: bool,
    pub motion: Option<String>,
    /// Explicit provider choice; omitted means heuristic selection.
    pub provider: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// Response payload for job inspection: status, error fields, and linked
/// assets. Partial success is never hidden.
#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub assets: Vec<Asset>,
}

/// POST /api/v1/generations
///
/// Validates, selects a provider, prices the job, and creates it with its
/// cost reservation in one transaction.
pub async fn create_generation(
    State(state): State<AppState>,
    Json(input): Json<CreateGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_request(
        &input.prompt,
        input.duration_secs,
        &input.resolution,
        input.motion.as_deref(),
        input.provider.as_deref(),
    )?;

    let explicit = input.provider.as_deref().and_then(VideoProviderId::parse);
    let provider = select_provider(&input.prompt, input.duration_secs, explicit);

    if let Some(motion) = input.motion.as_deref().and_then(MotionIntensity::parse) {
        if !video_caps(provider).supports_motion(motion) {
            return Err(AppError::BadRequest(format!(
                "provider '{provider}' does not support {motion:?} motion",
            )));
        }
    }

    let resolution = Resolution::from_label(&input.resolution);
    let cost_cents = job_cost_cents(provider, input.duration_secs, resolution, input.with_audio);

    let create = CreateJob {
        user_id: input.user_id,
        project_id: input.project_id,
        prompt: input.prompt.trim().to_string(),
        requested_duration_secs: input.duration_secs,
        resolution: resolution.as_str().to_string(),
        with_audio: input.with_audio,
        motion: input.motion,
        provider_id: provider.as_str().to_string(),
        cost_cents,
        platforms: input.platforms,
    };

    match JobRepo::create_with_reservation(&state.pool, &create).await? {
        ReservationOutcome::Created(job) => {
            tracing::info!(
                job_id = job.id,
                user_id = job.user_id,
                provider = %job.provider_id,
                cost_cents = job.cost_cents,
                "Generation job created",
            );
            Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
        }
        ReservationOutcome::InsufficientCredits { balance_cents, required_cents } => {
            Err(AppError::InsufficientCredits { balance_cents, required_cents })
        }
    }
}

/// GET /api/v1/generations/{id}
pub async fn get_generation(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<JobDetail>>> {
    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(reelforge_core::error::CoreError::NotFound { entity: "job", id: job_id })?;

    let assets = AssetRepo::list_by_job(&state.pool, job_id).await?;

    Ok(Json(DataResponse { data: JobDetail { job, assets } }))
}

/// GET /api/v1/generations/{id}/ledger
///
/// The financial trail for one job (reservation and, on failure, refund).
pub async fn get_generation_ledger(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<reelforge_db::models::ledger::LedgerEntry>>>> {
    let entries = LedgerRepo::entries_for_job(&state.pool, job_id).await?;
    Ok(Json(DataResponse { data: entries }))
}
