use super::StoreState;
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Serialize;
use tracing::error;

/// Server status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub stored_keys: usize,
    pub live_keys: usize,
    pub live_subscribers: usize,
}

/// Create API routes
pub fn api_routes(state: StoreState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .with_state(state)
}

/// GET /api/status - Get server status
async fn get_status(State(state): State<StoreState>) -> impl IntoResponse {
    let stats = state.store.hub().get_stats().await;
    let stored_keys = state.store.repo().count().unwrap_or_else(|e| {
        error!("Failed to count rows: {}", e);
        0
    });

    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stored_keys,
        live_keys: stats.active_keys,
        live_subscribers: stats.active_connections,
    })
}
