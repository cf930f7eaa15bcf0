pub mod api;
pub mod auth_log;
pub mod cron;
pub mod data;
pub mod push;
pub mod tools;
pub mod ws;

use crate::store::ServerStore;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;

pub use api::api_routes;
pub use auth_log::auth_log_routes;
pub use cron::cron_routes;
pub use data::data_routes;
pub use push::push_routes;
pub use tools::tools_routes;
pub use ws::ws_handler;

/// Shared state for handlers that only need the store
#[derive(Clone)]
pub struct StoreState {
    pub store: Arc<ServerStore>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}
