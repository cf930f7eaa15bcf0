//! HTTP + WebSocket client for a Tracker server.
//!
//! Rows are read and written over the REST endpoints under `/api/data`;
//! change subscriptions are one WebSocket per key on `/api/subscribe`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use tracker_core::callback_registry::SubscriptionId;
use tracker_core::error::{Result, TrackerError};
use tracker_core::remote::{BoxFuture, ChangeCallback, ChangeFeed, RemoteStore};
use tracker_core::SyncedEntry;

#[derive(Serialize)]
struct PutBody<'a> {
    value: &'a Value,
    updated_at: DateTime<Utc>,
}

/// Remote store backed by a Tracker server.
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
    handle: Handle,
    subscriptions: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl HttpRemoteStore {
    /// Talk to the server at `base_url`, running subscriptions on `handle`.
    pub fn new(base_url: &str, handle: Handle) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            handle,
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn data_url(&self, key: &str) -> String {
        format!("{}/api/data/{}", self.base_url, urlencoding::encode(key))
    }

    async fn get_row(&self, key: &str) -> Result<Option<SyncedEntry>> {
        let response = self
            .client
            .get(self.data_url(key))
            .send()
            .await
            .map_err(remote_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(remote_error)?;
        let entry = response.json::<SyncedEntry>().await.map_err(remote_error)?;
        Ok(Some(entry))
    }

    async fn put_row(&self, entry: &SyncedEntry) -> Result<()> {
        self.client
            .put(self.data_url(&entry.key))
            .json(&PutBody {
                value: &entry.value,
                updated_at: entry.updated_at,
            })
            .send()
            .await
            .map_err(remote_error)?
            .error_for_status()
            .map_err(remote_error)?;
        Ok(())
    }

    async fn get_rows(&self) -> Result<Vec<SyncedEntry>> {
        self.client
            .get(format!("{}/api/data", self.base_url))
            .send()
            .await
            .map_err(remote_error)?
            .error_for_status()
            .map_err(remote_error)?
            .json::<Vec<SyncedEntry>>()
            .await
            .map_err(remote_error)
    }
}

fn remote_error(e: reqwest::Error) -> TrackerError {
    TrackerError::Remote(e.to_string())
}

/// WebSocket URL of the change feed for `key`.
pub fn subscribe_url(base_url: &str, key: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|e| TrackerError::Remote(e.to_string()))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| TrackerError::Remote(format!("Cannot use {} for WebSocket", base_url)))?;
    url.set_path("/api/subscribe");
    url.query_pairs_mut().clear().append_pair("key", key);
    Ok(url)
}

impl RemoteStore for HttpRemoteStore {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SyncedEntry>>> {
        Box::pin(self.get_row(key))
    }

    fn upsert<'a>(&'a self, entry: &'a SyncedEntry) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.put_row(entry))
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<SyncedEntry>>> {
        Box::pin(self.get_rows())
    }
}

impl ChangeFeed for HttpRemoteStore {
    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Result<SubscriptionId> {
        let url = subscribe_url(&self.base_url, key).map_err(|e| TrackerError::Subscribe {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let key = key.to_string();

        let task = self.handle.spawn(async move {
            let (mut ws, _) = match connect_async(url.as_str()).await {
                Ok(connection) => connection,
                Err(e) => {
                    log::warn!("Change feed for '{}' unavailable: {}", key, e);
                    return;
                }
            };
            log::debug!("Subscribed to changes of '{}'", key);

            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<SyncedEntry>(&text) {
                        Ok(entry) if entry.key == key => callback(&entry),
                        Ok(_) => {}
                        Err(e) => log::warn!("Ignoring malformed change event: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Change feed for '{}' closed: {}", key, e);
                        break;
                    }
                }
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let task = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match task {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for HttpRemoteStore {
    fn drop(&mut self) {
        let subscriptions = self
            .subscriptions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, task) in subscriptions.drain() {
            task.abort();
        }
    }
}
