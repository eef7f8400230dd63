//! Repository for the `jobs` table.
//!
//! Every status mutation is a guarded UPDATE carrying the expected current
//! status, so per-job transitions are serialized: a late monitor sweep and a
//! just-arrived webhook can both try to move the same job, but only one
//! UPDATE finds its precondition true.

use reelforge_core::status::JobStatus;
use reelforge_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::job::{CreateJob, Job};
use crate::models::ledger::entry_types;
use crate::repositories::ledger_repo::LedgerRepo;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, project_id, status_id, prompt, requested_duration_secs, \
    resolution, with_audio, motion, provider_id, provider_job_handle, \
    provider_data, cost_cents, image_asset_id, video_asset_id, \
    error_message, error_code, started_at, completed_at, processing_time_ms, \
    claimed_at, claimed_by, created_at, updated_at";

/// Result of attempting to create a job with its cost reservation.
#[derive(Debug)]
pub enum ReservationOutcome {
    /// Job created; the `usage` ledger entry exists.
    Created(Job),
    /// The user's ledger balance cannot cover the job cost. Nothing was
    /// written.
    InsufficientCredits { balance_cents: i64, required_cents: i32 },
}

/// Column updates a step may apply atomically with its checkpoint.
#[derive(Debug, Default, Clone)]
pub struct JobPatch {
    /// Guarded status transition `(expected, target)`.
    pub transition: Option<(JobStatus, JobStatus)>,
    pub image_asset_id: Option<DbId>,
    pub video_asset_id: Option<DbId>,
    pub provider_job_handle: Option<String>,
    /// Merged into `provider_data` with `||`.
    pub provider_data: Option<serde_json::Value>,
    /// Set `completed_at` and compute `processing_time_ms` from
    /// `started_at`.
    pub mark_completed: bool,
}

/// Provides CRUD and transition operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a job and reserve its cost, atomically.
    ///
    /// Takes a per-user advisory lock so concurrent creations for the same
    /// user cannot both pass the balance check, then inserts the job row
    /// and its `usage` ledger entry in one transaction.
    pub async fn create_with_reservation(
        pool: &PgPool,
        input: &CreateJob,
    ) -> Result<ReservationOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(input.user_id)
            .execute(&mut *tx)
            .await?;

        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM credit_ledger WHERE user_id = $1",
        )
        .bind(input.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if balance < input.cost_cents as i64 {
            return Ok(ReservationOutcome::InsufficientCredits {
                balance_cents: balance,
                required_cents: input.cost_cents,
            });
        }

        let query = format!(
            "INSERT INTO jobs \
                 (user_id, project_id, status_id, prompt, requested_duration_secs, \
                  resolution, with_audio, motion, provider_id, cost_cents, provider_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(input.user_id)
            .bind(input.project_id)
            .bind(JobStatus::Queued.id())
            .bind(&input.prompt)
            .bind(input.requested_duration_secs)
            .bind(&input.resolution)
            .bind(input.with_audio)
            .bind(&input.motion)
            .bind(&input.provider_id)
            .bind(input.cost_cents)
            .bind(serde_json::json!({ "platforms": input.platforms }))
            .fetch_one(&mut *tx)
            .await?;

        LedgerRepo::append_tx(
            &mut tx,
            input.user_id,
            -input.cost_cents,
            entry_types::USAGE,
            &format!("Reserved for generation job {}", job.id),
            Some(job.id),
        )
        .await?;

        tx.commit().await?;
        Ok(ReservationOutcome::Created(job))
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the job holding an external render handle for a provider.
    pub async fn find_by_provider_handle(
        pool: &PgPool,
        provider_id: &str,
        handle: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE provider_id = $1 AND provider_job_handle = $2"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(provider_id)
            .bind(handle)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest unclaimed queued job for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` to prevent double-dispatch when
    /// multiple worker instances are running.
    pub async fn claim_next(
        pool: &PgPool,
        worker: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET claimed_at = NOW(), claimed_by = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $2 AND claimed_at IS NULL \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(worker)
            .bind(JobStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Re-claim one non-terminal job whose claim lease expired (worker
    /// crashed mid-workflow). The checkpointed workflow resumes from where
    /// the dead worker left off.
    pub async fn reclaim_stalled(
        pool: &PgPool,
        worker: &str,
        lease_cutoff: Timestamp,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET claimed_at = NOW(), claimed_by = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id NOT IN ($2, $3) \
                   AND claimed_at IS NOT NULL \
                   AND claimed_at < $4 \
                 ORDER BY claimed_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(worker)
            .bind(JobStatus::Completed.id())
            .bind(JobStatus::Failed.id())
            .bind(lease_cutoff)
            .fetch_optional(pool)
            .await
    }

    /// Refresh the claim lease while a long wait is in progress.
    pub async fn touch_claim(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET claimed_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set `started_at` once; re-entry after a crash keeps the original.
    pub async fn mark_started(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET started_at = COALESCE(started_at, NOW()), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Guarded status transition.
    ///
    /// Returns `true` only if the job was in `from` and is now in `to`.
    /// A `false` return means another actor already moved the job.
    pub async fn transition(
        pool: &PgPool,
        job_id: DbId,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::transition_tx(&mut conn, job_id, from, to).await
    }

    /// Transaction-composable form of [`JobRepo::transition`].
    pub async fn transition_tx(
        conn: &mut PgConnection,
        job_id: DbId,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, sqlx::Error> {
        if !from.can_transition(to) {
            tracing::warn!(
                job_id,
                from = from.as_str(),
                to = to.as_str(),
                "Rejected invalid status transition"
            );
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(job_id)
        .bind(from.id())
        .bind(to.id())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a step's column patch inside the caller's transaction.
    ///
    /// Returns `false` if the patch carried a transition whose precondition
    /// no longer holds; the caller should roll back.
    pub async fn apply_patch_tx(
        conn: &mut PgConnection,
        job_id: DbId,
        patch: &JobPatch,
    ) -> Result<bool, sqlx::Error> {
        if let Some((from, to)) = patch.transition {
            if !Self::transition_tx(conn, job_id, from, to).await? {
                return Ok(false);
            }
        }
        if let Some(asset_id) = patch.image_asset_id {
            sqlx::query("UPDATE jobs SET image_asset_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(job_id)
                .bind(asset_id)
                .execute(&mut *conn)
                .await?;
        }
        if let Some(asset_id) = patch.video_asset_id {
            sqlx::query("UPDATE jobs SET video_asset_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(job_id)
                .bind(asset_id)
                .execute(&mut *conn)
                .await?;
        }
        if let Some(handle) = &patch.provider_job_handle {
            sqlx::query(
                "UPDATE jobs SET provider_job_handle = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(job_id)
            .bind(handle)
            .execute(&mut *conn)
            .await?;
        }
        if let Some(data) = &patch.provider_data {
            sqlx::query(
                "UPDATE jobs SET provider_data = provider_data || $2, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(job_id)
            .bind(data)
            .execute(&mut *conn)
            .await?;
        }
        if patch.mark_completed {
            sqlx::query(
                "UPDATE jobs SET completed_at = NOW(), \
                     processing_time_ms = (EXTRACT(EPOCH FROM (NOW() - started_at)) * 1000)::BIGINT, \
                     updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(job_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(true)
    }

    /// Mark a non-terminal job failed. Terminal jobs are untouched.
    ///
    /// Returns `true` if the row changed.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        error_code: &str,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_code = $3, error_message = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($5, $6)",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error_code)
        .bind(error_message)
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::Failed.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a non-terminal job failed and refund its reserved cost, in one
    /// transaction.
    ///
    /// The `FOR UPDATE` read plus the terminal re-check make this safe to
    /// run repeatedly and concurrently: an already-compensated job is a
    /// no-op, so exactly one refund entry ever exists per job.
    pub async fn fail_with_refund(
        pool: &PgPool,
        job_id: DbId,
        error_code: &str,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 FOR UPDATE");
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(job) = job else {
            return Ok(false);
        };
        if job.is_terminal() {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_code = $3, error_message = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error_code)
        .bind(error_message)
        .execute(&mut *tx)
        .await?;

        if job.cost_cents > 0 {
            LedgerRepo::append_tx(
                &mut tx,
                job.user_id,
                job.cost_cents,
                entry_types::REFUND,
                &format!("Refund for failed generation job {job_id}"),
                Some(job_id),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Complete a job from VIDEO_READY, stamping duration bookkeeping.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, completed_at = NOW(), \
                 processing_time_ms = (EXTRACT(EPOCH FROM (NOW() - started_at)) * 1000)::BIGINT, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::VideoReady.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Non-terminal jobs that started before `cutoff`: the monitor's
    /// candidates for timeout compensation.
    pub async fn find_stale(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id NOT IN ($1, $2) \
               AND started_at IS NOT NULL \
               AND started_at < $3 \
             ORDER BY started_at ASC"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Completed.id())
            .bind(JobStatus::Failed.id())
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Delete failed jobs whose terminal timestamp is older than `cutoff`.
    ///
    /// Step checkpoints cascade; assets are kept with `job_id` nulled.
    pub async fn delete_failed_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status_id = $1 AND completed_at < $2",
        )
        .bind(JobStatus::Failed.id())
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
