//! Test utilities for tracker_core
//!
//! This module provides shared testing infrastructure: a blocking executor for
//! boxed futures, a cache that always fails, and a ready-made registry wired to
//! in-memory collaborators.

use std::future::Future;
use std::sync::Arc;

use crate::cache::{LocalCache, MemoryCache};
use crate::error::{Result, TrackerError};
use crate::remote::MemoryRemoteStore;
use crate::sync::{DeferredSpawner, SyncRegistry};

/// Run a future to completion on the current thread.
pub(crate) fn block_on_test<F: Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}

/// A local cache whose storage is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCache;

impl LocalCache for FailingCache {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(TrackerError::CacheUnavailable("storage disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(TrackerError::CacheUnavailable("storage disabled".to_string()))
    }
}

/// One simulated client: its own cache and task queue, sharing `remote`.
pub struct TestClient {
    pub registry: Arc<SyncRegistry>,
    pub cache: MemoryCache,
    pub spawner: DeferredSpawner,
}

impl TestClient {
    /// Create a client talking to `remote`.
    pub fn new(remote: &Arc<MemoryRemoteStore>) -> Self {
        Self::with_cache(remote, MemoryCache::new())
    }

    /// Create a client with a pre-populated cache.
    pub fn with_cache(remote: &Arc<MemoryRemoteStore>, cache: MemoryCache) -> Self {
        let spawner = DeferredSpawner::new();
        let registry = SyncRegistry::new(
            Arc::new(cache.clone()),
            remote.clone(),
            remote.clone(),
            Arc::new(spawner.clone()),
        );
        Self {
            registry,
            cache,
            spawner,
        }
    }
}
