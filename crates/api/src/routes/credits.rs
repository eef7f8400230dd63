//! Credit balance and ledger inspection.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use reelforge_core::types::DbId;
use reelforge_db::models::ledger::LedgerEntry;
use reelforge_db::repositories::LedgerRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreditsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreditsView {
    pub balance_cents: i64,
    pub entries: Vec<LedgerEntry>,
}

/// GET /api/v1/users/{id}/credits
pub async fn get_credits(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(query): Query<CreditsQuery>,
) -> AppResult<Json<DataResponse<CreditsView>>> {
    let balance_cents = LedgerRepo::balance(&state.pool, user_id).await?;
    let entries = LedgerRepo::recent_for_user(&state.pool, user_id, query.limit).await?;

    Ok(Json(DataResponse { data: CreditsView { balance_cents, entries } }))
}
