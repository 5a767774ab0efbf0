use anyhow::anyhow;
use axum::{Json, extract::State, response::IntoResponse};

use podium_types::models::RankedUser;

use crate::ApiError;
use crate::ranking;
use crate::state::AppState;

/// Compute the ranking fresh from the store. There is no cache anywhere in
/// this path: every caller (the HTTP endpoint, the claim fan-out, a newly
/// connected subscriber) sees the store's current state.
pub async fn current_ranking(state: &AppState) -> Result<Vec<RankedUser>, ApiError> {
    let db_state = state.clone();
    let users = tokio::task::spawn_blocking(move || db_state.db.list_users_by_rank())
        .await
        .map_err(|e| ApiError::Internal(anyhow!("ranking task join error: {e}")))??;

    Ok(ranking::rank(users))
}

/// GET /api/leaderboard
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = current_ranking(&state).await?;
    Ok(Json(entries))
}
