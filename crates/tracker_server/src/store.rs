//! [`RemoteStore`] over the server's own database.
//!
//! Every upsert that commits is published to the [`ChangeHub`], which is
//! what turns the table into a change feed for WebSocket subscribers.

use std::sync::Arc;

use tracker_core::entry::validate_key;
use tracker_core::error::{Result, TrackerError};
use tracker_core::remote::{BoxFuture, RemoteStore};
use tracker_core::SyncedEntry;

use crate::db::DataRepo;
use crate::sync::ChangeHub;

/// The server's store: SQLite rows plus change fan-out
pub struct ServerStore {
    repo: Arc<DataRepo>,
    hub: Arc<ChangeHub>,
}

impl ServerStore {
    pub fn new(repo: Arc<DataRepo>, hub: Arc<ChangeHub>) -> Self {
        Self { repo, hub }
    }

    pub fn repo(&self) -> &Arc<DataRepo> {
        &self.repo
    }

    pub fn hub(&self) -> &Arc<ChangeHub> {
        &self.hub
    }

    async fn write(&self, entry: &SyncedEntry) -> Result<()> {
        validate_key(&entry.key)?;
        self.repo.upsert(entry).map_err(db_error)?;
        self.hub.publish(entry).await;
        Ok(())
    }
}

fn db_error(e: rusqlite::Error) -> TrackerError {
    TrackerError::Remote(e.to_string())
}

impl RemoteStore for ServerStore {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SyncedEntry>>> {
        Box::pin(async move { self.repo.get(key).map_err(db_error) })
    }

    fn upsert<'a>(&'a self, entry: &'a SyncedEntry) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write(entry))
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<SyncedEntry>>> {
        Box::pin(async move { self.repo.list().map_err(db_error) })
    }
}
