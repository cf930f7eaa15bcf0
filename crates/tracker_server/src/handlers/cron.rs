use super::error_response;
use crate::config::Config;
use crate::notify::dispatch_due;
use crate::push::PushSender;
use crate::store::ServerStore;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json},
    routing::get,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Shared state for the reminder fan-out
#[derive(Clone)]
pub struct CronState {
    pub store: Arc<ServerStore>,
    pub sender: Arc<dyn PushSender>,
    pub config: Arc<Config>,
}

/// Create cron routes
pub fn cron_routes(state: CronState) -> Router {
    Router::new()
        .route("/cron/notify", get(notify))
        .with_state(state)
}

/// Whether the request carries `Authorization: Bearer <secret>`.
/// Without a configured secret every request is accepted.
fn is_authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == secret)
}

/// GET /api/cron/notify - Send the reminders due this minute
async fn notify(State(state): State<CronState>, headers: HeaderMap) -> impl IntoResponse {
    if !is_authorized(&headers, state.config.cron_secret.as_deref()) {
        warn!("Unauthorized attempt to access cron route");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match run_once(&state).await {
        Ok(outcome) => match outcome.message {
            Some(message) => Json(json!({ "message": message })).into_response(),
            None => Json(json!({
                "success": true,
                "sent": outcome.sent,
                "failed": outcome.failed,
            }))
            .into_response(),
        },
        Err(e) => {
            error!("Reminder fan-out failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn run_once(state: &CronState) -> tracker_core::Result<crate::notify::DispatchOutcome> {
    dispatch_due(
        state.store.as_ref(),
        state.sender.as_ref(),
        Utc::now(),
        state.config.notify_offset,
        &state.config.notification_title,
    )
    .await
}

/// Run the fan-out in-process once per wall-clock minute
pub fn spawn_internal_cron(state: CronState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_minute = None;

        loop {
            interval.tick().await;
            let minute = Utc::now().timestamp().div_euclid(60);
            if last_minute == Some(minute) {
                continue;
            }
            last_minute = Some(minute);

            match run_once(&state).await {
                Ok(outcome) if outcome.sent + outcome.failed > 0 => {
                    info!("Sent {} reminders ({} failed)", outcome.sent, outcome.failed);
                }
                Ok(_) => {}
                Err(e) => error!("Reminder fan-out failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_open_without_secret() {
        assert!(is_authorized(&HeaderMap::new(), None));
    }

    #[test]
    fn test_bearer_secret() {
        assert!(is_authorized(&headers_with("Bearer s3cret"), Some("s3cret")));
        assert!(!is_authorized(&headers_with("Bearer wrong"), Some("s3cret")));
        assert!(!is_authorized(&headers_with("s3cret"), Some("s3cret")));
        assert!(!is_authorized(&HeaderMap::new(), Some("s3cret")));
    }
}
