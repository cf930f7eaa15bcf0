//! In-memory remote store for testing and single-process hosts.
//!
//! This provides a simple implementation of both [`RemoteStore`] and
//! [`ChangeFeed`]: one row per key in a `HashMap`, and a callback registry that
//! is notified after every committed upsert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::{BoxFuture, ChangeCallback, ChangeFeed, RemoteStore};
use crate::callback_registry::{CallbackRegistry, SubscriptionId};
use crate::entry::{SyncedEntry, validate_key};
use crate::error::{Result, TrackerError};

/// In-memory remote store.
///
/// Share one instance (behind an `Arc`) between several registries to
/// simulate several clients talking to the same backend.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    /// Rows (key -> latest entry)
    rows: RwLock<HashMap<String, SyncedEntry>>,
    /// Change subscribers
    feed: CallbackRegistry<SyncedEntry>,
    /// When false every operation fails as if the backend were unreachable
    available: AtomicBool,
    /// Number of committed upserts
    upserts: AtomicUsize,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            feed: CallbackRegistry::new(),
            available: AtomicBool::new(true),
            upserts: AtomicUsize::new(0),
        }
    }
}

impl MemoryRemoteStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without notifying subscribers (builder pattern).
    pub fn with_entry(self, entry: SyncedEntry) -> Self {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.key.clone(), entry);
        self
    }

    /// Toggle availability. While unavailable, reads, writes and new
    /// subscriptions fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Read a row synchronously (for assertions).
    pub fn get(&self, key: &str) -> Option<SyncedEntry> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of committed upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Number of open change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TrackerError::Remote("remote store unreachable".to_string()))
        }
    }

    fn commit(&self, entry: &SyncedEntry) -> Result<()> {
        self.ensure_available()?;
        validate_key(&entry.key)?;
        {
            let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
            rows.insert(entry.key.clone(), entry.clone());
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.feed.emit(entry);
        Ok(())
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SyncedEntry>>> {
        Box::pin(async move {
            self.ensure_available()?;
            Ok(self.get(key))
        })
    }

    fn upsert<'a>(&'a self, entry: &'a SyncedEntry) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.commit(entry) })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<SyncedEntry>>> {
        Box::pin(async move {
            self.ensure_available()?;
            let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
            let mut entries: Vec<SyncedEntry> = rows.values().cloned().collect();
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(entries)
        })
    }
}

impl ChangeFeed for MemoryRemoteStore {
    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Result<SubscriptionId> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TrackerError::Subscribe {
                key: key.to_string(),
                reason: "remote store unreachable".to_string(),
            });
        }

        let key = key.to_string();
        Ok(self.feed.subscribe(Arc::new(move |entry: &SyncedEntry| {
            if entry.key == key {
                callback(entry);
            }
        })))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.feed.unsubscribe(id)
    }
}
