use rusqlite::{Connection, Result};

/// Database schema for the tracker server
const SCHEMA: &str = r#"
-- One JSON value per key, last write wins
CREATE TABLE IF NOT EXISTS user_data (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    -- RFC 3339 with full sub-second precision, as written by the client
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_data_updated_at ON user_data(updated_at);
"#;

/// Initialize the database schema
pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_database() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(tables, vec!["user_data"]);
    }

    #[test]
    fn test_init_database_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        init_database(&conn).unwrap();
    }
}
