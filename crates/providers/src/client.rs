//! HTTP clients for the provider JSON APIs.
//!
//! All backends speak the same minimal render protocol: `POST /v1/renders`
//! to submit, `GET /v1/renders/{handle}` to poll, `POST /v1/images` for
//! synchronous image generation. The `Idempotency-Key` header carries the
//! step engine's key so a retried submission returns the original handle
//! instead of starting a second render.

use async_trait::async_trait;
use serde::Deserialize;

use reelforge_core::error::CoreError;
use reelforge_core::poll::PollOutcome;
use reelforge_core::provider::VideoProviderId;

use crate::{ImageArtifact, ImageProvider, ImageRequest, VideoProvider, VideoRequest};

/// Header carrying the idempotency key on mutating calls.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Connection settings for one provider endpoint.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub api_key: String,
}

impl ProviderEndpoint {
    /// Load `{PREFIX}_API_URL` / `{PREFIX}_API_KEY` from the environment.
    pub fn from_env(prefix: &str) -> Self {
        let base_url = std::env::var(format!("{prefix}_API_URL"))
            .unwrap_or_else(|_| format!("http://localhost:9800/{}", prefix.to_lowercase()));
        let api_key = std::env::var(format!("{prefix}_API_KEY")).unwrap_or_default();
        Self { base_url, api_key }
    }
}

// ---------------------------------------------------------------------------
// Wire schemas
// ---------------------------------------------------------------------------

/// `POST /v1/renders` response.
#[derive(Debug, Deserialize)]
struct SubmitRenderResponse {
    job_handle: String,
}

/// `GET /v1/renders/{handle}` response.
#[derive(Debug, Deserialize)]
pub struct RenderStatusResponse {
    pub status: String,
    pub artifact_url: Option<String>,
    pub error: Option<String>,
}

impl RenderStatusResponse {
    /// Map the wire status onto a poll outcome.
    ///
    /// Unknown status strings are treated as still-pending rather than
    /// failing the wait: a provider adding intermediate states must not
    /// break running jobs.
    pub fn into_outcome(self) -> Result<PollOutcome, CoreError> {
        match self.status.as_str() {
            "completed" => {
                let artifact_url = self.artifact_url.ok_or_else(|| {
                    CoreError::Provider("completed render carried no artifact_url".into())
                })?;
                Ok(PollOutcome::Completed { artifact_url })
            }
            "failed" => Ok(PollOutcome::Failed {
                message: self.error.unwrap_or_else(|| "provider reported failure".into()),
            }),
            _ => Ok(PollOutcome::Pending),
        }
    }
}

// ---------------------------------------------------------------------------
// Video client
// ---------------------------------------------------------------------------

/// Reqwest-backed [`VideoProvider`].
pub struct HttpVideoProvider {
    id: VideoProviderId,
    endpoint: ProviderEndpoint,
    http: reqwest::Client,
}

impl HttpVideoProvider {
    pub fn new(id: VideoProviderId, endpoint: ProviderEndpoint) -> Self {
        Self {
            id,
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl VideoProvider for HttpVideoProvider {
    fn id(&self) -> VideoProviderId {
        self.id
    }

    async fn submit(&self, request: &VideoRequest) -> Result<String, CoreError> {
        let response = self
            .http
            .post(self.url("/v1/renders"))
            .bearer_auth(&self.endpoint.api_key)
            .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: submit failed: {e}", self.id)))?;

        if !response.status().is_success() {
            return Err(CoreError::Provider(format!(
                "{}: submit returned HTTP {}",
                self.id,
                response.status()
            )));
        }

        let body: SubmitRenderResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: malformed submit response: {e}", self.id)))?;

        tracing::info!(provider = %self.id, handle = %body.job_handle, "Render submitted");
        Ok(body.job_handle)
    }

    async fn poll_status(&self, handle: &str) -> Result<PollOutcome, CoreError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/renders/{handle}")))
            .bearer_auth(&self.endpoint.api_key)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: poll failed: {e}", self.id)))?;

        if !response.status().is_success() {
            return Err(CoreError::Provider(format!(
                "{}: poll returned HTTP {}",
                self.id,
                response.status()
            )));
        }

        let body: RenderStatusResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: malformed poll response: {e}", self.id)))?;
        body.into_outcome()
    }
}

// ---------------------------------------------------------------------------
// Image client
// ---------------------------------------------------------------------------

/// Reqwest-backed [`ImageProvider`].
pub struct HttpImageProvider {
    id: String,
    endpoint: ProviderEndpoint,
    http: reqwest::Client,
}

impl HttpImageProvider {
    pub fn new(id: impl Into<String>, endpoint: ProviderEndpoint) -> Self {
        Self {
            id: id.into(),
            endpoint,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageProvider for HttpImageProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageArtifact, CoreError> {
        let url = format!("{}/v1/images", self.endpoint.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.endpoint.api_key)
            .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: generate failed: {e}", self.id)))?;

        if !response.status().is_success() {
            return Err(CoreError::Provider(format!(
                "{}: generate returned HTTP {}",
                self.id,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::Provider(format!("{}: malformed image response: {e}", self.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> RenderStatusResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn completed_status_yields_artifact() {
        let outcome = status(r#"{"status":"completed","artifact_url":"https://cdn/x.mp4"}"#)
            .into_outcome()
            .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Completed { artifact_url: "https://cdn/x.mp4".into() }
        );
    }

    #[test]
    fn completed_without_artifact_is_a_provider_error() {
        let result = status(r#"{"status":"completed"}"#).into_outcome();
        assert!(matches!(result, Err(CoreError::Provider(_))));
    }

    #[test]
    fn failed_status_carries_message() {
        let outcome = status(r#"{"status":"failed","error":"nsfw content"}"#)
            .into_outcome()
            .unwrap();
        assert_eq!(outcome, PollOutcome::Failed { message: "nsfw content".into() });
    }

    #[test]
    fn failed_without_message_gets_a_default() {
        let outcome = status(r#"{"status":"failed"}"#).into_outcome().unwrap();
        assert!(matches!(outcome, PollOutcome::Failed { .. }));
    }

    #[test]
    fn queued_and_unknown_statuses_are_pending() {
        for s in ["queued", "processing", "warming_up"] {
            let outcome = status(&format!(r#"{{"status":"{s}"}}"#)).into_outcome().unwrap();
            assert_eq!(outcome, PollOutcome::Pending);
        }
    }
}
