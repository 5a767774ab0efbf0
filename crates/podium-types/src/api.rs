use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Users --

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

// -- Claims --

/// `userId` is a string rather than a `Uuid` so that a missing or malformed
/// id surfaces as a 400 with a useful message instead of a serde reject.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub user_id: Uuid,
    pub name: String,
    pub earned: i64,
    pub total_points: i64,
    pub history_id: Uuid,
}

// -- History --

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

pub fn default_history_limit() -> u32 {
    100
}

// -- Errors --

/// Error body shared by every endpoint: `{ "error": "..." }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Liveness --

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct NotFoundBody {
    pub error: &'static str,
    pub path: String,
}
