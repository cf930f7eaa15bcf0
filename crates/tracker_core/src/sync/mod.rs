//! Synchronized state.
//!
//! A [`SyncedState`] is a binding to one key of the remote store. Bindings are
//! created through a [`SyncRegistry`], which keeps a single shared state per
//! key: every binding for `"budget"` in the process sees the same value, and
//! the registry holds one remote change subscription for it no matter how many
//! bindings exist.
//!
//! ## Lifecycle of a key
//!
//! 1. The first binding seeds the value from the local cache synchronously.
//! 2. A background task reads the remote row and adopts it if present.
//! 3. A change subscription applies every update other clients commit.
//! 4. When the last binding for the key is dropped, the subscription closes.
//!    Background work still in flight finds the state gone and does nothing.
//!
//! ## Writes
//!
//! [`SyncedState::set`] and [`SyncedState::update`] change the value and the
//! local cache immediately, then hand the remote upsert to the registry's
//! [`TaskSpawner`]. Remote failures are logged, never returned.
//!
//! ## Stale reads
//!
//! Every write is stamped with a per-key strictly increasing timestamp. A
//! remote value is only applied when its `updated_at` is newer than anything
//! the key has already seen, so a slow startup read cannot overwrite a local
//! edit, and a client's own echoed write is ignored.

mod registry;
mod spawn;
mod state;

pub use registry::SyncRegistry;
#[cfg(feature = "tokio")]
pub use spawn::TokioSpawner;
pub use spawn::{DeferredSpawner, TaskSpawner};
pub use state::SyncedState;
