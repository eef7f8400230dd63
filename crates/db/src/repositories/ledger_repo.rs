//! Repository for the append-only `credit_ledger` table.
//!
//! No row is ever updated or deleted here; compensation is expressed as new
//! `refund` entries, and a user's balance is always a sum over entries.

use reelforge_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::ledger::LedgerEntry;

/// Column list for `credit_ledger` queries.
const COLUMNS: &str =
    "id, user_id, amount_cents, entry_type, description, job_id, created_at";

/// Default page size for entry listings.
const DEFAULT_LIMIT: i64 = 50;

/// Provides append and query operations for the credit ledger.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Append an entry.
    pub async fn append(
        pool: &PgPool,
        user_id: DbId,
        amount_cents: i32,
        entry_type: &str,
        description: &str,
        job_id: Option<DbId>,
    ) -> Result<LedgerEntry, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::append_tx(&mut conn, user_id, amount_cents, entry_type, description, job_id).await
    }

    /// Transaction-composable form of [`LedgerRepo::append`].
    pub async fn append_tx(
        conn: &mut PgConnection,
        user_id: DbId,
        amount_cents: i32,
        entry_type: &str,
        description: &str,
        job_id: Option<DbId>,
    ) -> Result<LedgerEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO credit_ledger (user_id, amount_cents, entry_type, description, job_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(user_id)
            .bind(amount_cents)
            .bind(entry_type)
            .bind(description)
            .bind(job_id)
            .fetch_one(conn)
            .await
    }

    /// Current balance: the sum of all entries for the user.
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM credit_ledger WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// All entries linked to one job, oldest first.
    pub async fn entries_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM credit_ledger WHERE job_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Most recent entries for a user.
    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM credit_ledger WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(user_id)
            .bind(limit.unwrap_or(DEFAULT_LIMIT))
            .fetch_all(pool)
            .await
    }
}
