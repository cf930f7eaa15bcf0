use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracker_core::SyncedEntry;

/// Repository for the `user_data` table
#[derive(Clone)]
pub struct DataRepo {
    conn: Arc<Mutex<Connection>>,
}

impl DataRepo {
    /// Create a new DataRepo with the given connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the row stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<SyncedEntry>, rusqlite::Error> {
        let conn = self.conn();
        conn.query_row(
            "SELECT key, value, updated_at FROM user_data WHERE key = ?",
            [key],
            entry_from_row,
        )
        .optional()
    }

    /// Insert or replace the row for `entry.key`
    pub fn upsert(&self, entry: &SyncedEntry) -> Result<(), rusqlite::Error> {
        let value = serde_json::to_string(&entry.value)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO user_data (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![entry.key, value, datetime_to_text(&entry.updated_at)],
        )?;
        Ok(())
    }

    /// Get every row, ordered by key
    pub fn list(&self) -> Result<Vec<SyncedEntry>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key, value, updated_at FROM user_data ORDER BY key")?;
        let rows = stmt.query_map([], entry_from_row)?;
        rows.collect()
    }

    /// Number of stored rows
    pub fn count(&self) -> Result<usize, rusqlite::Error> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM user_data", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
    }
}

fn entry_from_row(row: &Row<'_>) -> Result<SyncedEntry, rusqlite::Error> {
    let value: String = row.get(1)?;
    let value: Value = serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let updated_at: String = row.get(2)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(SyncedEntry::with_timestamp(row.get::<_, String>(0)?, value, updated_at))
}

/// Fixed-width RFC 3339 so stored timestamps keep their precision and sort as text.
fn datetime_to_text(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
