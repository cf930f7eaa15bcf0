//! Per-key shared state and the registry that deduplicates it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::spawn::TaskSpawner;
use super::state::SyncedState;
use crate::cache::{LocalCache, read_json, write_json};
use crate::callback_registry::{CallbackRegistry, SubscriptionId};
use crate::entry::{SyncedEntry, validate_key};
use crate::remote::{ChangeCallback, ChangeFeed, RemoteStore};
use crate::schema::Schema;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide map from key to shared synchronized state.
///
/// Create one registry per process (or per test client) and share it.
pub struct SyncRegistry {
    cache: Arc<dyn LocalCache>,
    remote: Arc<dyn RemoteStore>,
    feed: Arc<dyn ChangeFeed>,
    spawner: Arc<dyn TaskSpawner>,
    /// Live key states. Entries die with their last binding and are pruned lazily.
    states: Mutex<HashMap<String, Weak<KeyState>>>,
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SyncRegistry {
    /// Create a registry wired to its collaborators.
    pub fn new(
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
        feed: Arc<dyn ChangeFeed>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cache,
            remote,
            feed,
            spawner,
            states: Mutex::new(HashMap::new()),
            schemas: RwLock::new(HashMap::new()),
        })
    }

    /// Version the payload stored under `key`.
    ///
    /// Register schemas before binding the key; a key that is already live
    /// keeps the rules it was bound with until its last binding drops.
    pub fn register_schema(&self, key: impl Into<String>, schema: Schema) {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(schema));
    }

    /// Bind to `key`, using `initial` until a value is known.
    pub fn bind<T>(&self, key: &str, initial: T) -> SyncedState<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        SyncedState::new(self.state_for(key), initial)
    }

    /// Keys with at least one live binding, sorted.
    pub fn active_keys(&self) -> Vec<String> {
        let states = lock(&self.states);
        let mut keys: Vec<String> = states
            .iter()
            .filter(|(_, state)| state.strong_count() > 0)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn state_for(&self, key: &str) -> Arc<KeyState> {
        let mut states = lock(&self.states);
        if let Some(state) = states.get(key).and_then(Weak::upgrade) {
            return state;
        }
        states.retain(|_, state| state.strong_count() > 0);

        if let Err(e) = validate_key(key) {
            log::warn!("Binding to unusable key: {}", e);
        }

        let schema = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();

        let state = Arc::new(KeyState {
            key: key.to_string(),
            inner: Mutex::new(Inner::default()),
            observers: CallbackRegistry::new(),
            subscription: Mutex::new(None),
            cache: Arc::clone(&self.cache),
            remote: Arc::clone(&self.remote),
            feed: Arc::clone(&self.feed),
            spawner: Arc::clone(&self.spawner),
            schema,
        });
        states.insert(key.to_string(), Arc::downgrade(&state));
        state.start();
        state
    }
}

impl std::fmt::Debug for SyncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRegistry")
            .field("active_keys", &self.active_keys())
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    /// Current payload (schema envelope already removed)
    payload: Option<Value>,
    /// Stamp of this key's most recent local write
    last_local_write: Option<DateTime<Utc>>,
    /// Newest stamp seen from either side; local stamps stay above it
    newest_seen: Option<DateTime<Utc>>,
}

/// State shared by every binding of one key.
pub(crate) struct KeyState {
    key: String,
    inner: Mutex<Inner>,
    pub(crate) observers: CallbackRegistry<Value>,
    subscription: Mutex<Option<SubscriptionId>>,
    cache: Arc<dyn LocalCache>,
    remote: Arc<dyn RemoteStore>,
    feed: Arc<dyn ChangeFeed>,
    spawner: Arc<dyn TaskSpawner>,
    schema: Option<Arc<Schema>>,
}

impl KeyState {
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// The current payload, if any is known.
    pub(crate) fn current(&self) -> Option<Value> {
        lock(&self.inner).payload.clone()
    }

    fn start(self: &Arc<Self>) {
        if let Some(stored) = read_json(self.cache.as_ref(), &self.key)
            && let Some(payload) = self.decode(stored)
        {
            lock(&self.inner).payload = Some(payload);
        }

        let weak = Arc::downgrade(self);
        let remote = Arc::clone(&self.remote);
        let key = self.key.clone();
        self.spawner.spawn(Box::pin(async move {
            match remote.fetch(&key).await {
                Ok(Some(entry)) if !entry.value.is_null() => {
                    if let Some(state) = weak.upgrade() {
                        state.apply_remote(&entry);
                    }
                }
                Ok(_) => log::debug!("No remote value for '{}'", key),
                Err(e) => log::warn!("Error loading '{}' from remote store: {}", key, e),
            }
        }));

        let weak = Arc::downgrade(self);
        let callback: ChangeCallback = Arc::new(move |entry: &SyncedEntry| {
            if let Some(state) = weak.upgrade() {
                state.apply_remote(entry);
            }
        });
        match self.feed.subscribe(&self.key, callback) {
            Ok(id) => *lock(&self.subscription) = Some(id),
            Err(e) => log::warn!("Live updates disabled for '{}': {}", self.key, e),
        }
    }

    /// Adopt a remote row unless it predates this client's last local write.
    ///
    /// Rows from other writers are never compared with each other: the
    /// remote store's latest commit wins even when its writer's clock lags.
    fn apply_remote(&self, entry: &SyncedEntry) {
        let Some(payload) = self.decode(entry.value.clone()) else {
            return;
        };

        let changed = {
            let mut inner = lock(&self.inner);
            if inner
                .last_local_write
                .is_some_and(|written| entry.updated_at <= written)
            {
                log::debug!(
                    "Ignoring remote value for '{}' from {}: not newer than last local write",
                    self.key,
                    entry.updated_at
                );
                return;
            }
            if inner.newest_seen.is_none_or(|seen| entry.updated_at > seen) {
                inner.newest_seen = Some(entry.updated_at);
            }
            write_json(self.cache.as_ref(), &self.key, &self.encode(&payload));
            let changed = inner.payload.as_ref() != Some(&payload);
            inner.payload = Some(payload.clone());
            changed
        };

        if changed {
            self.observers.emit(&payload);
        }
    }

    /// Resolve and apply a local write, then upsert it in the background.
    ///
    /// `resolve` receives the current payload and runs under the state lock,
    /// so concurrent updaters never see the same previous value. Returning
    /// `None` abandons the write.
    pub(crate) fn write_with<F>(&self, resolve: F)
    where
        F: FnOnce(Option<&Value>) -> Option<Value>,
    {
        let (entry, changed) = {
            let mut inner = lock(&self.inner);
            let Some(payload) = resolve(inner.payload.as_ref()) else {
                return;
            };

            let mut stamp = Utc::now();
            if let Some(seen) = inner.newest_seen
                && stamp <= seen
            {
                stamp = seen + TimeDelta::microseconds(1);
            }

            let stored = self.encode(&payload);
            write_json(self.cache.as_ref(), &self.key, &stored);

            let changed = inner.payload.as_ref() != Some(&payload);
            inner.payload = Some(payload.clone());
            inner.last_local_write = Some(stamp);
            inner.newest_seen = Some(stamp);

            (
                SyncedEntry::with_timestamp(self.key.clone(), stored, stamp),
                changed.then_some(payload),
            )
        };

        let remote = Arc::clone(&self.remote);
        self.spawner.spawn(Box::pin(async move {
            if let Err(e) = remote.upsert(&entry).await {
                log::error!("Error saving '{}' to remote store: {}", entry.key, e);
            }
        }));

        if let Some(payload) = changed {
            self.observers.emit(&payload);
        }
    }

    fn decode(&self, stored: Value) -> Option<Value> {
        let Some(schema) = &self.schema else {
            return Some(stored);
        };
        match schema.decode(&self.key, stored) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Discarding stored value: {}", e);
                None
            }
        }
    }

    fn encode(&self, payload: &Value) -> Value {
        match &self.schema {
            Some(schema) => schema.encode(payload),
            None => payload.clone(),
        }
    }
}

impl Drop for KeyState {
    fn drop(&mut self) {
        let subscription = self
            .subscription
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = subscription {
            self.feed.unsubscribe(id);
            log::debug!("Closed change subscription for '{}'", self.key);
        }
    }
}
