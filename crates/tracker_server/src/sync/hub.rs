use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};
use tracker_core::SyncedEntry;

/// Buffered changes per key before a slow subscriber starts lagging
const CHANNEL_CAPACITY: usize = 256;

/// Statistics about live subscriptions
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    pub active_connections: usize,
    pub active_keys: usize,
}

/// Routes committed writes to the connections subscribed to each key
#[derive(Default)]
pub struct ChangeHub {
    /// Map of key to its room
    rooms: RwLock<HashMap<String, Arc<KeyRoom>>>,
}

impl ChangeHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the room for `key`, creating it if needed.
    ///
    /// The subscription is taken while the room map is locked, so a room
    /// being emptied concurrently cannot be removed out from under the joiner.
    pub async fn join(&self, key: &str) -> (Arc<KeyRoom>, broadcast::Receiver<SyncedEntry>) {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(key) {
                let rx = room.subscribe();
                return (room.clone(), rx);
            }
        }

        let mut rooms = self.rooms.write().await;

        // Double-check after acquiring write lock
        let room = match rooms.get(key) {
            Some(room) => room.clone(),
            None => {
                let room = Arc::new(KeyRoom::new());
                rooms.insert(key.to_string(), room.clone());
                info!("Opened change room for key: {}", key);
                room
            }
        };
        let rx = room.subscribe();
        (room, rx)
    }

    /// Remove a room if it has no active connections
    pub async fn maybe_remove_room(&self, key: &str) {
        let mut rooms = self.rooms.write().await;

        if let Some(room) = rooms.get(key)
            && room.connection_count() == 0
        {
            rooms.remove(key);
            debug!("Closed idle change room: {}", key);
        }
    }

    /// Deliver a committed write to everyone watching its key
    pub async fn publish(&self, entry: &SyncedEntry) {
        let rooms = self.rooms.read().await;
        if let Some(room) = rooms.get(&entry.key) {
            room.publish(entry.clone());
        }
    }

    /// Get statistics about live subscriptions
    pub async fn get_stats(&self) -> HubStats {
        let rooms = self.rooms.read().await;
        HubStats {
            active_connections: rooms.values().map(|r| r.connection_count()).sum(),
            active_keys: rooms.len(),
        }
    }
}

/// Subscribers of a single key
pub struct KeyRoom {
    broadcast_tx: broadcast::Sender<SyncedEntry>,
    connection_count: AtomicUsize,
}

impl KeyRoom {
    fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            broadcast_tx,
            connection_count: AtomicUsize::new(0),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SyncedEntry> {
        self.connection_count.fetch_add(1, Ordering::SeqCst);
        self.broadcast_tx.subscribe()
    }

    /// Called when a connection leaves the room
    pub fn unsubscribe(&self) {
        self.connection_count.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of connections in the room
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    fn publish(&self, entry: SyncedEntry) {
        // No receivers is not an error
        let _ = self.broadcast_tx.send(entry);
    }
}
