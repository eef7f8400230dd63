//! Domain error taxonomy shared by every crate in the workspace.

use crate::status::error_codes;

/// Error type for domain-level failures.
///
/// The taxonomy is split along retry behavior: [`CoreError::is_transient`]
/// decides whether a failed workflow invocation may be re-entered (resuming
/// from the last checkpoint) or must mark the job failed immediately.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed validation (unsupported duration, resolution, provider).
    #[error("Validation error: {0}")]
    Validation(String),

    /// An entity was looked up by id and does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// An external AI provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// An async wait exceeded its attempt bound.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// An object-storage write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation conflicts with current state (e.g. insufficient credits).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Anything that should never happen in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a whole-workflow retry may succeed.
    ///
    /// Transient errors propagate without mutating job status so a later
    /// re-entry resumes from the last checkpoint. Permanent errors mark the
    /// job failed at the point of classification. `Conflict` is transient:
    /// it means another actor moved the job mid-step, and re-entry will
    /// observe that actor's outcome instead of fighting it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Provider(_)
                | CoreError::Storage(_)
                | CoreError::Timeout(_)
                | CoreError::Conflict(_)
        )
    }

    /// Machine-readable code stored on the job's `error_code` column.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => error_codes::VALIDATION_ERROR,
            CoreError::NotFound { .. } => error_codes::NOT_FOUND,
            CoreError::Provider(_) => error_codes::PROVIDER_ERROR,
            CoreError::Timeout(_) => error_codes::TIMEOUT,
            CoreError::Storage(_) => error_codes::STORAGE_ERROR,
            CoreError::Conflict(_) => error_codes::CONFLICT,
            CoreError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type CoreResult<T> = Result<T, CoreError>;
