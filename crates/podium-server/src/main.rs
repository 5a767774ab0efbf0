mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::Uri,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use podium_api::points::RandomPoints;
use podium_api::{AppState, AppStateInner, claims, leaderboard, users};
use podium_gateway::Dispatcher;
use podium_types::api::{NotFoundBody, StatusResponse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podium=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("PODIUM_DB_PATH").unwrap_or_else(|_| "podium.db".into());
    let host = std::env::var("PODIUM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PODIUM_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;

    // Init database
    let db = podium_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher,
        points: Box::new(RandomPoints),
    });

    let app = Router::new()
        .route("/", get(status))
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route("/api/users/{user_id}/history", get(users::get_history))
        .route("/api/claim", post(claims::submit_claim))
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .route("/ws", get(ws::ws_upgrade))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Leaderboard server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn status() -> impl IntoResponse {
    Json(StatusResponse {
        status: "ok",
        message: "Leaderboard API running",
    })
}

/// Helpful 404 for wrong base URLs.
async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            error: "Not Found",
            path: uri.path().to_string(),
        }),
    )
}
