//! Repository for the `webhook_events` table.

use reelforge_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::webhook_event::WebhookEvent;

/// Column list for `webhook_events` queries.
const COLUMNS: &str =
    "id, provider_id, job_id, provider_job_handle, payload, outcome, received_at";

/// Provides audit recording for inbound provider callbacks.
pub struct WebhookEventRepo;

impl WebhookEventRepo {
    /// Record an inbound callback and how it was handled.
    pub async fn record(
        pool: &PgPool,
        provider_id: &str,
        job_id: Option<DbId>,
        provider_job_handle: &str,
        payload: &serde_json::Value,
        outcome: &str,
    ) -> Result<WebhookEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO webhook_events \
                 (provider_id, job_id, provider_job_handle, payload, outcome) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookEvent>(&query)
            .bind(provider_id)
            .bind(job_id)
            .bind(provider_job_handle)
            .bind(payload)
            .bind(outcome)
            .fetch_one(pool)
            .await
    }

    /// Delete callback records that never matched a job and are older than
    /// `cutoff`.
    pub async fn delete_orphaned_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM webhook_events WHERE job_id IS NULL AND received_at < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
