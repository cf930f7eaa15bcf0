use super::error_response;
use crate::email::EmailService;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

/// Shared state for unlock alerts
#[derive(Clone)]
pub struct AuthLogState {
    pub email_service: Arc<EmailService>,
    /// Wall clock the alert time is shown in
    pub offset: FixedOffset,
}

/// Unlock event reported by the lock screen
#[derive(Debug, Default, Deserialize)]
pub struct AuthLogRequest {
    /// Milliseconds since the epoch or an RFC 3339 string
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, rename = "userAgent")]
    pub user_agent: Option<String>,
}

/// Create auth log routes
pub fn auth_log_routes(state: AuthLogState) -> Router {
    Router::new()
        .route("/auth-log", post(auth_log))
        .with_state(state)
}

/// Render the reported unlock time in `offset`, falling back to the raw value.
fn describe_timestamp(timestamp: Option<&Value>, offset: FixedOffset) -> String {
    let parsed = match timestamp {
        None | Some(Value::Null) => Some(Utc::now()),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(_) => None,
    };

    match (parsed, timestamp) {
        (Some(dt), _) => dt
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        (None, Some(Value::String(s))) => s.clone(),
        (None, Some(other)) => other.to_string(),
        (None, None) => String::new(),
    }
}

/// POST /api/auth-log - Email an unlock alert
async fn auth_log(
    State(state): State<AuthLogState>,
    Json(body): Json<AuthLogRequest>,
) -> impl IntoResponse {
    if !state.email_service.is_configured() {
        return Json(json!({ "error": "Email service not configured" })).into_response();
    }

    let when = describe_timestamp(body.timestamp.as_ref(), state.offset);
    let device = body.user_agent.as_deref().unwrap_or("Unknown device");

    match state.email_service.send_unlock_alert(&when, device).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => {
            error!("Failed to send unlock alert: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
