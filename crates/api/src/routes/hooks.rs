//! Inbound provider webhook receiver.
//!
//! Translates a provider's async completion callback into a job-status
//! update, the shortcut path past the poller. Guarded transitions make a
//! duplicate callback (or a callback racing the poller) harmless: exactly
//! one COMPLETED transition and one linked video asset ever result.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use reelforge_core::hashing::to_hex;
use reelforge_core::provider::VideoProviderId;
use reelforge_core::status::{error_codes, JobStatus};
use reelforge_db::models::asset::{kinds, CreateAsset};
use reelforge_db::models::webhook_event::outcomes;
use reelforge_db::repositories::{AssetRepo, JobPatch, JobRepo, WebhookEventRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "X-Render-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Provider callback payload.
#[derive(Debug, Deserialize)]
pub struct RenderCallback {
    pub job_handle: String,
    pub status: String,
    pub artifact_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HookResult {
    pub outcome: &'static str,
}

/// Check the callback signature against the shared secret.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = to_hex(&mac.finalize().into_bytes());
    expected.eq_ignore_ascii_case(signature_hex.trim())
}

/// POST /api/v1/hooks/render/{provider}
pub async fn render_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<DataResponse<HookResult>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;
    if !verify_signature(&state.config.webhook_secret, &body, signature) {
        return Err(AppError::InvalidSignature);
    }

    let provider_id = VideoProviderId::parse(&provider)
        .ok_or_else(|| AppError::BadRequest(format!("unknown provider '{provider}'")))?;

    let callback: RenderCallback = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed callback body: {e}")))?;
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();

    let job = JobRepo::find_by_provider_handle(
        &state.pool,
        provider_id.as_str(),
        &callback.job_handle,
    )
    .await?;

    let Some(job) = job else {
        WebhookEventRepo::record(
            &state.pool,
            provider_id.as_str(),
            None,
            &callback.job_handle,
            &payload,
            outcomes::ORPHANED,
        )
        .await?;
        tracing::warn!(
            provider = %provider_id,
            handle = %callback.job_handle,
            "Webhook for unknown render handle",
        );
        return Ok(Json(DataResponse { data: HookResult { outcome: outcomes::ORPHANED } }));
    };

    let outcome = match callback.status.as_str() {
        "completed" => {
            let artifact_url = callback.artifact_url.ok_or_else(|| {
                AppError::BadRequest("completed callback carried no artifact_url".into())
            })?;
            apply_completion(&state, &job, provider_id, &callback.job_handle, artifact_url).await?
        }
        "failed" => {
            let message = callback
                .error
                .unwrap_or_else(|| "provider reported failure".into());
            let applied = JobRepo::fail_with_refund(
                &state.pool,
                job.id,
                error_codes::PROVIDER_ERROR,
                &message,
            )
            .await?;
            if applied { outcomes::APPLIED } else { outcomes::STALE }
        }
        // Progress pings carry no transition.
        _ => outcomes::STALE,
    };

    WebhookEventRepo::record(
        &state.pool,
        provider_id.as_str(),
        Some(job.id),
        &callback.job_handle,
        &payload,
        outcome,
    )
    .await?;

    tracing::info!(
        job_id = job.id,
        provider = %provider_id,
        outcome,
        "Webhook processed",
    );
    Ok(Json(DataResponse { data: HookResult { outcome } }))
}

/// Apply a completion callback: link the video asset and advance the job.
async fn apply_completion(
    state: &AppState,
    job: &reelforge_db::models::job::Job,
    provider_id: VideoProviderId,
    handle: &str,
    artifact_url: String,
) -> Result<&'static str, AppError> {
    // Converges with the poller's upsert on the same (job_id, kind) row.
    let asset = AssetRepo::upsert(
        &state.pool,
        &CreateAsset {
            user_id: job.user_id,
            project_id: job.project_id,
            job_id: job.id,
            kind: kinds::VIDEO.to_string(),
            storage_key: format!("external/{provider_id}/{handle}"),
            url: artifact_url,
            width: None,
            height: None,
            duration_secs: None,
            generated_by: provider_id.as_str().to_string(),
            prompt: job.prompt.clone(),
        },
    )
    .await?;

    let mut tx = state.pool.begin().await?;
    let patch = JobPatch {
        transition: Some((JobStatus::GeneratingVideo, JobStatus::VideoReady)),
        video_asset_id: Some(asset.id),
        ..Default::default()
    };
    let applied = JobRepo::apply_patch_tx(&mut tx, job.id, &patch).await?;
    if applied {
        tx.commit().await?;
        Ok(outcomes::APPLIED)
    } else {
        tx.rollback().await?;
        Ok(outcomes::STALE)
    }
}
