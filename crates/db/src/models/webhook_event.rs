//! Inbound provider webhook audit records.

use reelforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// What happened when an inbound callback was applied.
pub mod outcomes {
    /// The callback advanced the job.
    pub const APPLIED: &str = "applied";
    /// The job had already moved past the callback (duplicate or late).
    pub const STALE: &str = "stale";
    /// No job matched the provider handle.
    pub const ORPHANED: &str = "orphaned";
}

/// A row from the `webhook_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEvent {
    pub id: DbId,
    pub provider_id: String,
    pub job_id: Option<DbId>,
    pub provider_job_handle: String,
    pub payload: serde_json::Value,
    pub outcome: String,
    pub received_at: Timestamp,
}
