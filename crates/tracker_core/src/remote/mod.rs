//! Remote store and change feed abstractions.
//!
//! The remote store is a shared table of `(key, value, updated_at)` rows,
//! consumed through three operations: point read by key, upsert by key, and a
//! change subscription filtered by key. The first two live on [`RemoteStore`],
//! the subscription on [`ChangeFeed`], so consumers that only read and write
//! (the AI tools, the server's cron job) need not provide a feed.
//!
//! ## Object safety
//!
//! Both traits are object-safe so the sync registry can hold them as
//! `Arc<dyn RemoteStore>` / `Arc<dyn ChangeFeed>`. Async methods therefore
//! return boxed futures.

mod memory;

pub use memory::MemoryRemoteStore;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::callback_registry::SubscriptionId;
use crate::entry::SyncedEntry;
use crate::error::Result;

/// A boxed future for object-safe async methods.
///
/// On native targets, futures are `Send` for compatibility with multi-threaded runtimes.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future for object-safe async methods.
///
/// WASM version without `Send` requirement - JavaScript is single-threaded.
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Callback invoked with the new row whenever a subscribed key changes.
pub type ChangeCallback = Arc<dyn Fn(&SyncedEntry) + Send + Sync>;

/// Point reads and unconditional upserts against the shared table.
pub trait RemoteStore: Send + Sync {
    /// Read the row stored under `key`.
    ///
    /// Returns `None` if no client has written the key yet.
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SyncedEntry>>>;

    /// Insert or replace the row for `entry.key`.
    ///
    /// There is no compare-and-swap: the last upsert to commit wins.
    fn upsert<'a>(&'a self, entry: &'a SyncedEntry) -> BoxFuture<'a, Result<()>>;

    /// List every stored row, ordered by key.
    fn list(&self) -> BoxFuture<'_, Result<Vec<SyncedEntry>>>;
}

/// Row-level change notifications filtered by key.
pub trait ChangeFeed: Send + Sync {
    /// Deliver every committed write to `key` to `callback`.
    ///
    /// The filter is an exact key match. Returns an ID for [`ChangeFeed::unsubscribe`].
    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Result<SubscriptionId>;

    /// Close a subscription.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
