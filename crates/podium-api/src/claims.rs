use anyhow::anyhow;
use axum::{Json, extract::State, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use podium_types::api::{ClaimRequest, ClaimResponse};
use podium_types::events::GatewayEvent;
use podium_types::models::{ClaimRecord, User};

use crate::ranking;
use crate::state::AppState;
use crate::ApiError;

/// Result of a successful claim, shared by both transports. The HTTP
/// handler renders it as a `ClaimResponse`; the gateway loop renders it as
/// a direct `ClaimResult` event.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub user: User,
    pub earned: i64,
    pub record: ClaimRecord,
}

/// The one write path. Draws a random 1-10 point value, applies it to the
/// user atomically at the store, recomputes the ranking and fans both the
/// new ranking and the new record out to every subscriber.
///
/// The returned outcome and the broadcast payloads are built from the same
/// post-mutation state. On error nothing is broadcast.
pub async fn process_claim(state: &AppState, user_id: Uuid) -> Result<ClaimOutcome, ApiError> {
    let points = state.points.draw();
    debug_assert!((1..=10).contains(&points));

    // Blocking store work stays off the async runtime.
    let db_state = state.clone();
    let (user, record, entries) = tokio::task::spawn_blocking(move || {
        let (user, record) = db_state.db.apply_claim(user_id, points)?;
        let users = db_state.db.list_users_by_rank()?;
        Ok::<_, ApiError>((user, record, ranking::rank(users)))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("claim task join error: {e}")))??;

    info!(
        user = %user.name,
        earned = points,
        total = user.total_points,
        "claim processed"
    );

    // Fire-and-forget fan-out: ranking first, then the record. Observers
    // must not rely on the relative order of the two events.
    state.dispatcher.broadcast(GatewayEvent::LeaderboardUpdate {
        entries,
    });
    state.dispatcher.broadcast(GatewayEvent::ClaimRecorded {
        record: record.clone(),
        name: user.name.clone(),
    });

    Ok(ClaimOutcome {
        user,
        earned: points,
        record,
    })
}

/// POST /api/claim
pub async fn submit_claim(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&req.user_id)?;
    let outcome = process_claim(&state, user_id).await?;

    Ok(Json(ClaimResponse {
        user_id: outcome.user.id,
        name: outcome.user.name,
        earned: outcome.earned,
        total_points: outcome.user.total_points,
        history_id: outcome.record.id,
    }))
}

/// Shared by the HTTP handler and the gateway's SubmitClaim command:
/// a missing, empty or malformed id is an `InvalidRequest`, surfaced only
/// to the caller.
pub fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::InvalidRequest("userId is required".into()));
    }
    raw.parse()
        .map_err(|_| ApiError::InvalidRequest("userId is not a valid id".into()))
}
