use super::{ChangeHub, KeyRoom};
use crate::db::DataRepo;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use tracker_core::SyncedEntry;

/// One WebSocket subscriber of a key
pub struct KeyConnection {
    pub key: String,
    room: Arc<KeyRoom>,
    broadcast_rx: broadcast::Receiver<SyncedEntry>,
    repo: Arc<DataRepo>,
}

impl KeyConnection {
    /// Subscribe to changes of `key`
    pub async fn open(hub: &ChangeHub, key: &str, repo: Arc<DataRepo>) -> Self {
        let (room, broadcast_rx) = hub.join(key).await;
        debug!("Subscriber joined key={}", key);

        Self {
            key: key.to_string(),
            room,
            broadcast_rx,
            repo,
        }
    }

    /// Receive the next change of this key.
    ///
    /// Returns `None` once the room is gone.
    pub async fn recv_change(&mut self) -> Option<SyncedEntry> {
        loop {
            match self.broadcast_rx.recv().await {
                Ok(entry) => return Some(entry),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        "Subscriber of {} lagged {} changes, sending current row",
                        self.key, n
                    );
                    // Intermediate values are superseded; only the latest row matters
                    match self.repo.get(&self.key) {
                        Ok(Some(entry)) => return Some(entry),
                        Ok(None) => continue,
                        Err(e) => {
                            error!("Failed to reload {} after lag: {}", self.key, e);
                            continue;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for KeyConnection {
    fn drop(&mut self) {
        self.room.unsubscribe();
        debug!("Subscriber left key={}", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use rusqlite::Connection;
    use serde_json::json;

    fn setup_repo() -> Arc<DataRepo> {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        Arc::new(DataRepo::new(conn))
    }

    #[tokio::test]
    async fn test_receives_published_change() {
        let hub = ChangeHub::new();
        let mut conn = KeyConnection::open(&hub, "streak_count", setup_repo()).await;

        let entry = SyncedEntry::new("streak_count", json!(4));
        hub.publish(&entry).await;

        assert_eq!(conn.recv_change().await, Some(entry));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_current_row() {
        let hub = ChangeHub::new();
        let repo = setup_repo();
        let mut conn = KeyConnection::open(&hub, "counter", repo.clone()).await;

        let mut last = None;
        for i in 0..300 {
            let entry = SyncedEntry::new("counter", json!(i));
            repo.upsert(&entry).unwrap();
            hub.publish(&entry).await;
            last = Some(entry);
        }

        let received = conn.recv_change().await.unwrap();
        assert_eq!(Some(received), last);
    }

    #[tokio::test]
    async fn test_drop_leaves_room() {
        let hub = ChangeHub::new();
        let conn = KeyConnection::open(&hub, "theme", setup_repo()).await;
        assert_eq!(hub.get_stats().await.active_connections, 1);

        drop(conn);
        assert_eq!(hub.get_stats().await.active_connections, 0);

        hub.maybe_remove_room("theme").await;
        assert_eq!(hub.get_stats().await.active_keys, 0);
    }
}
