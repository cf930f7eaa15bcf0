use super::StoreState;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::Value;
use tracing::debug;
use tracker_core::error::TrackerError;
use tracker_core::tools::{ToolCall, ToolOutput, definitions, execute};

/// Create AI tool routes
pub fn tools_routes(state: StoreState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .with_state(state)
}

/// GET /api/tools - Tool definitions for the model
async fn list_tools() -> impl IntoResponse {
    Json(definitions())
}

/// POST /api/tools/{name} - Run a tool against the store
async fn call_tool(
    State(state): State<StoreState>,
    Path(name): Path<String>,
    Json(arguments): Json<Value>,
) -> impl IntoResponse {
    let call = match ToolCall::parse(&name, arguments) {
        Ok(call) => call,
        Err(e @ TrackerError::UnknownTool(_)) => {
            return (StatusCode::NOT_FOUND, Json(ToolOutput::failure(e))).into_response();
        }
        Err(e) => return (StatusCode::BAD_REQUEST, Json(ToolOutput::failure(e))).into_response(),
    };

    debug!("Running tool {} on {}", name, call.key());
    Json(execute(state.store.as_ref(), call).await).into_response()
}
