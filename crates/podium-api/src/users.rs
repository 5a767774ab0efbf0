use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use podium_types::api::{CreateUserRequest, HistoryQuery};
use podium_types::events::GatewayEvent;
use podium_types::models::ClaimRecord;

use crate::ApiError;
use crate::state::AppState;

/// History responses are bounded regardless of what the caller asks for.
const MAX_HISTORY: u32 = 100;

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::InvalidRequest("Name is required".into()));
    }

    let db_state = state.clone();
    let user = tokio::task::spawn_blocking(move || db_state.db.create_user(&name))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("create task join error: {e}")))??;

    info!(user = %user.name, id = %user.id, "user created");

    // Notification only, no payload: subscribers re-fetch the user list.
    state.dispatcher.broadcast(GatewayEvent::UsersChanged);

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let users = tokio::task::spawn_blocking(move || db_state.db.list_users())
        .await
        .map_err(|e| ApiError::Internal(anyhow!("list task join error: {e}")))??;

    Ok(Json(users))
}

/// GET /api/users/{user_id}/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = fetch_history(&state, user_id, query.limit).await?;
    Ok(Json(records))
}

/// Bounded, newest-first claim history. Reads the store directly — there
/// is no staleness window against a cache because there is no cache.
pub async fn fetch_history(
    state: &AppState,
    user_id: Uuid,
    limit: u32,
) -> Result<Vec<ClaimRecord>, ApiError> {
    let limit = limit.min(MAX_HISTORY);

    let db_state = state.clone();
    let records = tokio::task::spawn_blocking(move || db_state.db.list_claims(user_id, limit))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("history task join error: {e}")))??;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use podium_db::Database;
    use podium_gateway::Dispatcher;

    use crate::points::FixedPoints;
    use crate::state::AppStateInner;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(),
            points: Box::new(FixedPoints::new(vec![1])),
        })
    }

    #[tokio::test]
    async fn create_user_trims_and_broadcasts() {
        let state = test_state();
        let mut rx = state.dispatcher.subscribe();

        create_user(
            State(state.clone()),
            Json(CreateUserRequest {
                name: "  Alice  ".into(),
            }),
        )
        .await
        .unwrap();

        let users = state.db.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Alice");

        assert!(matches!(rx.recv().await, Ok(GatewayEvent::UsersChanged)));
    }

    #[tokio::test]
    async fn blank_name_is_invalid_request() {
        let state = test_state();
        let err = create_user(
            State(state.clone()),
            Json(CreateUserRequest { name: "   ".into() }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(state.db.list_users().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict_and_broadcasts_nothing() {
        let state = test_state();
        state.db.create_user("Alice").unwrap();
        let mut rx = state.dispatcher.subscribe();

        let err = create_user(
            State(state.clone()),
            Json(CreateUserRequest {
                name: "Alice".into(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(state.db.list_users().unwrap().len(), 1);
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn history_limit_is_clamped_to_the_cap() {
        let state = test_state();
        let alice = state.db.create_user("Alice").unwrap();
        for _ in 0..110 {
            state.db.apply_claim(alice.id, 1).unwrap();
        }

        // Even an absurd requested limit comes back capped.
        let records = fetch_history(&state, alice.id, 10_000).await.unwrap();
        assert_eq!(records.len(), MAX_HISTORY as usize);

        let records = fetch_history(&state, alice.id, 5).await.unwrap();
        assert_eq!(records.len(), 5);
    }

    #[tokio::test]
    async fn history_for_unknown_user_is_empty() {
        let state = test_state();
        let records = fetch_history(&state, Uuid::new_v4(), 100).await.unwrap();
        assert!(records.is_empty());
    }
}
