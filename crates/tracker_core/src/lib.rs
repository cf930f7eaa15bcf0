#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Local cache (per-device key/value persistence)
pub mod cache;

/// Thread-safe callback registry shared by change feeds and observers
pub mod callback_registry;

/// Configuration options
pub mod config;

/// Synced entries (the rows of the remote store)
pub mod entry;

/// Error (common error types)
pub mod error;

/// Notification schedules and push subscriptions
pub mod notify;

/// Remote store and change feed abstractions
pub mod remote;

/// Schema versioning for stored payloads
pub mod schema;

/// Synchronized state (registry, bindings, task spawning)
pub mod sync;

/// AI tool definitions and execution
pub mod tools;

#[cfg(test)]
pub mod test_utils;

pub use entry::SyncedEntry;
pub use error::{Result, TrackerError};
pub use sync::{SyncRegistry, SyncedState};
