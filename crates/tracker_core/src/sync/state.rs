use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::registry::KeyState;
use crate::callback_registry::SubscriptionId;

/// A live binding to one key.
///
/// Reads never block on the network and writes never fail: every remote
/// problem degrades to the last value known locally. Dropping the binding
/// removes its observers; dropping the last binding for a key closes the
/// key's remote subscription.
pub struct SyncedState<T> {
    state: Arc<KeyState>,
    initial: T,
    listeners: Mutex<Vec<SubscriptionId>>,
}

impl<T> SyncedState<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(state: Arc<KeyState>, initial: T) -> Self {
        Self {
            state,
            initial,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The key this binding mirrors.
    pub fn key(&self) -> &str {
        self.state.key()
    }

    /// The latest known value.
    ///
    /// Falls back to the binding's initial value while nothing is known, or
    /// when the stored payload does not have the shape of `T`.
    pub fn get(&self) -> T {
        self.state
            .current()
            .and_then(|payload| self.parse(payload))
            .unwrap_or_else(|| self.initial.clone())
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        let key = self.key().to_string();
        self.state.write_with(move |_| to_payload(&key, &value));
    }

    /// Replace the value with `f(previous)`.
    ///
    /// `f` runs while the key's state is locked and must not call back into
    /// bindings of the same key.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        self.state.write_with(|current| {
            let previous = current
                .cloned()
                .and_then(|payload| self.parse(payload))
                .unwrap_or_else(|| self.initial.clone());
            to_payload(self.key(), &f(previous))
        });
    }

    /// Call `f` with the new value whenever it changes, locally or remotely.
    pub fn on_change<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let initial = self.initial.clone();
        let id = self.state.observers.subscribe(Arc::new(move |payload: &Value| {
            let value = serde_json::from_value(payload.clone()).unwrap_or_else(|_| initial.clone());
            f(value);
        }));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
        id
    }

    /// Remove an observer added with [`SyncedState::on_change`].
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|listener| *listener != id);
        self.state.observers.unsubscribe(id)
    }

    fn parse(&self, payload: Value) -> Option<T> {
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Stored value for '{}' has an unexpected shape: {}", self.key(), e);
                None
            }
        }
    }
}

fn to_payload<T: Serialize>(key: &str, value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            log::error!("Cannot serialize new value for '{}': {}", key, e);
            None
        }
    }
}

impl<T> Drop for SyncedState<T> {
    fn drop(&mut self) {
        let listeners = self
            .listeners
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for id in listeners.drain(..) {
            self.state.observers.unsubscribe(id);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SyncedState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedState")
            .field("key", &self.state.key())
            .field("initial", &self.initial)
            .finish()
    }
}
