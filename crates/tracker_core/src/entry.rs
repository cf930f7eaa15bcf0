//! The unit of synchronization.
//!
//! A [`SyncedEntry`] mirrors one row of the remote `user_data` table: an opaque
//! string key, an arbitrary JSON value, and the timestamp written by whichever
//! client last stored it. The store holds at most one row per key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrackerError};

/// One row of the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedEntry {
    /// Key chosen by the feature that owns the value (e.g. `"daily_routine"`)
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// When the writer stored this value
    pub updated_at: DateTime<Utc>,
}

impl SyncedEntry {
    /// Create an entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self::with_timestamp(key, value, Utc::now())
    }

    /// Create an entry with an explicit timestamp.
    pub fn with_timestamp(key: impl Into<String>, value: Value, updated_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            updated_at,
        }
    }

    /// Short single-line preview of the value, for listings.
    pub fn preview(&self, max_chars: usize) -> String {
        let rendered = self.value.to_string();
        if rendered.chars().count() <= max_chars {
            return rendered;
        }
        let truncated: String = rendered.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// Reject keys that cannot address a row.
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(TrackerError::InvalidKey(key.to_string()));
    }
    Ok(())
}
