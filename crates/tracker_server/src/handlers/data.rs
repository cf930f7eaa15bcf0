use super::{StoreState, error_response};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};
use tracker_core::SyncedEntry;
use tracker_core::entry::validate_key;
use tracker_core::remote::RemoteStore;

/// Body of a write
#[derive(Debug, Deserialize)]
pub struct PutDataRequest {
    pub value: Value,
    /// Writer's timestamp. Defaults to the time the server receives the write.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create data routes
pub fn data_routes(state: StoreState) -> Router {
    Router::new()
        .route("/data", get(list_data))
        .route("/data/{key}", get(get_data).put(put_data))
        .with_state(state)
}

/// GET /api/data - List every row
async fn list_data(State(state): State<StoreState>) -> impl IntoResponse {
    match state.store.list().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            error!("Failed to list data: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list data")
        }
    }
}

/// GET /api/data/{key} - Read one row
async fn get_data(State(state): State<StoreState>, Path(key): Path<String>) -> impl IntoResponse {
    match state.store.fetch(&key).await {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("No data stored under '{}'", key)),
        Err(e) => {
            error!("Failed to read {}: {}", key, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read data")
        }
    }
}

/// PUT /api/data/{key} - Insert or replace one row
async fn put_data(
    State(state): State<StoreState>,
    Path(key): Path<String>,
    Json(body): Json<PutDataRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_key(&key) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let entry = SyncedEntry::with_timestamp(
        key,
        body.value,
        body.updated_at.unwrap_or_else(Utc::now),
    );

    match state.store.upsert(&entry).await {
        Ok(()) => {
            debug!("Stored {} ({})", entry.key, entry.updated_at);
            Json(entry).into_response()
        }
        Err(e) => {
            error!("Failed to store {}: {}", entry.key, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store data")
        }
    }
}
