//! Step names and idempotency keys for the checkpointed workflows.

use crate::hashing::sha256_hex;
use crate::types::DbId;

/// Image sub-workflow: generate, store, and link the source image.
pub const STEP_GENERATE_IMAGE: &str = "generate_image";

/// Video sub-workflow: submit the external render job.
pub const STEP_SUBMIT_VIDEO: &str = "submit_video_render";

/// Video sub-workflow: wait for the external render to finish.
pub const STEP_AWAIT_VIDEO: &str = "await_video_render";

/// Composite workflow: publish metadata + completion bookkeeping.
pub const STEP_FINALIZE: &str = "finalize";

/// Key sent with every external call a step makes, so re-execution after a
/// crash is disambiguated on the provider side and never double-creates or
/// double-charges.
pub fn idempotency_key(job_id: DbId, step_name: &str) -> String {
    sha256_hex(format!("{job_id}:{step_name}").as_bytes())
}
