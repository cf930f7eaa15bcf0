//! Local cache abstraction.
//!
//! The local cache is a durable per-device key/value store holding the
//! JSON-serialized value of each synced key. It is read synchronously when a
//! binding is created (so the first paint needs no network round-trip) and
//! written on every local or remote change.
//!
//! Failures here are never fatal: [`read_json`] treats an unavailable cache or
//! a corrupt payload as a miss, and [`write_json`] logs and moves on.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;

pub use memory::MemoryCache;
#[cfg(not(target_arch = "wasm32"))]
pub use native::FileCache;

use serde_json::Value;

use crate::error::Result;

/// Durable per-device key/value store.
///
/// Values are opaque strings; the sync layer stores JSON in them.
pub trait LocalCache: Send + Sync {
    /// Read the raw string stored under `key`.
    ///
    /// Returns `None` if nothing is stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read and parse the JSON value cached under `key`.
///
/// Storage errors and parse failures are logged and reported as a miss.
pub fn read_json(cache: &dyn LocalCache, key: &str) -> Option<Value> {
    let raw = match cache.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Error reading local cache for '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring corrupt local cache entry for '{}': {}", key, e);
            None
        }
    }
}

/// Serialize `value` and store it under `key`, logging any failure.
pub fn write_json(cache: &dyn LocalCache, key: &str, value: &Value) {
    let raw = value.to_string();
    if let Err(e) = cache.set(key, &raw) {
        log::warn!("Error writing local cache for '{}': {}", key, e);
    }
}
