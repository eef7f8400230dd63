//! Credit ledger entity.

use reelforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Ledger entry types stored in `credit_ledger.entry_type`.
pub mod entry_types {
    /// Credits bought by the user (positive amount).
    pub const PURCHASE: &str = "purchase";
    /// Cost reserved for a job at creation (negative amount).
    pub const USAGE: &str = "usage";
    /// Compensation restoring a reserved cost (positive amount).
    pub const REFUND: &str = "refund";
}

/// A row from the append-only `credit_ledger` table.
///
/// A user's balance is the sum of their entries; no separate counter
/// exists, so balances cannot drift.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub user_id: DbId,
    /// Signed cents: positive for purchase/refund, negative for usage.
    pub amount_cents: i32,
    pub entry_type: String,
    pub description: String,
    pub job_id: Option<DbId>,
    pub created_at: Timestamp,
}
