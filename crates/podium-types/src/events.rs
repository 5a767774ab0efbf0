use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ClaimRecord, RankedUser};

/// Events pushed to WebSocket subscribers.
///
/// `LeaderboardUpdate`, `ClaimRecorded` and `UsersChanged` are broadcast to
/// every connected client. `ClaimResult` and `ClaimError` are delivered only
/// to the connection that submitted the claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// The full ranking after a change. Also sent once on connect so a new
    /// subscriber is not left blank until the next claim.
    LeaderboardUpdate { entries: Vec<RankedUser> },

    /// A claim was recorded. Clients filter to the user they are viewing.
    ClaimRecorded { record: ClaimRecord, name: String },

    /// The user set changed (someone was created). Notification only —
    /// subscribers re-fetch the user list.
    UsersChanged,

    /// Direct acknowledgement of this connection's own claim.
    #[serde(rename_all = "camelCase")]
    ClaimResult {
        user_id: Uuid,
        name: String,
        earned: i64,
        total_points: i64,
        history_id: Uuid,
    },

    /// Direct rejection of this connection's own claim. Never broadcast.
    ClaimError { code: String, message: String },
}

/// Commands sent FROM client TO server over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Submit a claim for a user. The id is a string so a missing or
    /// malformed value can be answered with a `ClaimError` instead of
    /// being dropped as an unparseable frame.
    #[serde(rename_all = "camelCase")]
    SubmitClaim {
        #[serde(default)]
        user_id: String,
    },
}
