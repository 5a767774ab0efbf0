pub mod claims;
pub mod error;
pub mod leaderboard;
pub mod points;
pub mod ranking;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
