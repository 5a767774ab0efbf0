use std::sync::Arc;

use podium_db::Database;
use podium_gateway::Dispatcher;

use crate::points::PointSource;

pub type AppState = Arc<AppStateInner>;

/// Shared application state. The dispatcher and the point source are
/// injected so the claim processor can be exercised in tests without a
/// live transport or real randomness.
pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub points: Box<dyn PointSource>,
}
