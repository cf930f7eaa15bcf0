use super::{StoreState, error_response};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
};
use serde_json::{Value, json};
use tracing::{error, info};
use tracker_core::SyncedEntry;
use tracker_core::notify::{
    PushSubscription, SCHEDULES_KEY, SUBSCRIPTIONS_KEY, merge_subscription, parse_schedules,
};
use tracker_core::remote::RemoteStore;

/// Create push routes
pub fn push_routes(state: StoreState) -> Router {
    Router::new()
        .route("/push/subscribe", post(subscribe))
        .route("/push/schedule", post(save_schedule))
        .with_state(state)
}

fn parse_subscription(body: Value) -> Option<PushSubscription> {
    let has_endpoint = body
        .get("endpoint")
        .and_then(Value::as_str)
        .is_some_and(|e| !e.trim().is_empty());
    if !has_endpoint {
        return None;
    }
    serde_json::from_value(body).ok()
}

/// POST /api/push/subscribe - Register a push subscription
async fn subscribe(State(state): State<StoreState>, Json(body): Json<Value>) -> impl IntoResponse {
    let Some(subscription) = parse_subscription(body) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid subscription");
    };

    let existing = match state.store.fetch(SUBSCRIPTIONS_KEY).await {
        Ok(existing) => existing,
        Err(e) => {
            error!("Failed to read push subscriptions: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save subscription");
        }
    };

    let endpoint = subscription.endpoint.clone();
    let merged = merge_subscription(existing.as_ref().map(|e| &e.value), subscription);
    let count = merged.len();

    let saved = match serde_json::to_value(merged) {
        Ok(value) => state
            .store
            .upsert(&SyncedEntry::new(SUBSCRIPTIONS_KEY, value))
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match saved {
        Ok(()) => {
            info!("Registered push endpoint {} ({} total)", endpoint, count);
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => {
            error!("Failed to save push subscription: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save subscription")
        }
    }
}

/// POST /api/push/schedule - Replace the reminder schedules
async fn save_schedule(State(state): State<StoreState>, Json(body): Json<Value>) -> impl IntoResponse {
    if !body.is_array() || parse_schedules(&body).is_err() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid schedule format");
    }

    match state.store.upsert(&SyncedEntry::new(SCHEDULES_KEY, body)).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => {
            error!("Failed to save schedules: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save schedule")
        }
    }
}
