#![doc = include_str!("../README.md")]

//! ## Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3030)
//! - `DATABASE_PATH`: Path to SQLite database (default: ./tracker.db)
//! - `CORS_ORIGINS`: Comma-separated list of allowed origins (default: `*`)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
//!   `SMTP_FROM_EMAIL`, `SMTP_FROM_NAME`: outgoing mail
//! - `ALERT_EMAIL_TO`: Recipient of unlock alerts
//! - `CRON_SECRET`: Bearer token required by `/api/cron/notify`
//! - `NOTIFY_UTC_OFFSET`: Offset schedule times are written in (default: +09:00)
//! - `NOTIFICATION_TITLE`: Reminder title (default: Personal Tracker)
//! - `INTERNAL_CRON`: `true` to run the reminder check in-process

pub mod config;
pub mod db;
pub mod email;
pub mod handlers;
pub mod notify;
pub mod push;
pub mod store;
pub mod sync;

pub use config::Config;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use handlers::{
    StoreState, api_routes, auth_log::AuthLogState, auth_log_routes, cron::CronState,
    cron_routes, data_routes, push_routes, tools_routes, ws_handler,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Everything the routes need
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<store::ServerStore>,
    pub email_service: Arc<email::EmailService>,
    pub push_sender: Arc<dyn push::PushSender>,
}

impl AppState {
    /// State for the reminder fan-out (also used by the internal ticker)
    pub fn cron_state(&self) -> CronState {
        CronState {
            store: self.store.clone(),
            sender: self.push_sender.clone(),
            config: self.config.clone(),
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the router
pub fn build_router(state: &AppState) -> Router {
    let store_state = StoreState {
        store: state.store.clone(),
    };
    let auth_log_state = AuthLogState {
        email_service: state.email_service.clone(),
        offset: state.config.notify_offset,
    };

    let api = Router::new()
        .merge(api_routes(store_state.clone()))
        .merge(data_routes(store_state.clone()))
        .merge(push_routes(store_state.clone()))
        .merge(tools_routes(store_state.clone()))
        .merge(cron_routes(state.cron_state()))
        .merge(auth_log_routes(auth_log_state))
        // Change feed
        .route("/subscribe", get(ws_handler).with_state(store_state));

    Router::new()
        // Health check
        .route("/", get(|| async { "Tracker Server" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
}
