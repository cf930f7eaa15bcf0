use super::StoreState;
use crate::sync::KeyConnection;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Query parameters for a change subscription
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    /// Key to watch
    pub key: String,
}

/// WebSocket upgrade handler for `/api/subscribe`
pub async fn ws_handler(
    State(state): State<StoreState>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if query.key.trim().is_empty() {
        warn!("Subscription rejected: empty key");
        return StatusCode::BAD_REQUEST.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, query.key))
        .into_response()
}

/// Stream every write of `key` to the socket until either side goes away
async fn handle_socket(socket: WebSocket, state: StoreState, key: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let hub = state.store.hub().clone();

    let mut connection = KeyConnection::open(&hub, &key, state.store.repo().clone()).await;
    info!("Subscriber connected: key={}", key);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Subscriber closed: key={}", key);
                        break;
                    }
                    // Subscribers only listen; writes go through PUT
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", key, e);
                        break;
                    }
                }
            }

            change = connection.recv_change() => {
                let Some(entry) = change else { break };
                match serde_json::to_string(&entry) {
                    Ok(json) => {
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to encode change of {}: {}", key, e),
                }
            }
        }
    }

    drop(connection);
    hub.maybe_remove_room(&key).await;
    info!("Subscriber disconnected: key={}", key);
}
