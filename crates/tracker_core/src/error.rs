use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Payload errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid key '{0}': keys must be non-empty")]
    InvalidKey(String),

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No server configured. Run 'tracker config set-server <url>' first.")]
    NoServerConfigured,

    // Sync errors
    #[error("Local cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Subscription to '{key}' failed: {reason}")]
    Subscribe { key: String, reason: String },

    // Schema errors
    #[error("Payload for '{key}' has schema version {found}, newer than supported version {supported}")]
    SchemaTooNew {
        key: String,
        found: u32,
        supported: u32,
    },

    #[error("No migration registered for '{key}' from schema version {from}")]
    MissingMigration { key: String, from: u32 },

    #[error("Migration of '{key}' from schema version {from} failed: {reason}")]
    Migration {
        key: String,
        from: u32,
        reason: String,
    },

    // Tool errors
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    // Notification errors
    #[error("Invalid notification time '{0}', expected HH:MM")]
    InvalidScheduleTime(String),

    #[error("Invalid UTC offset '{0}', expected +HH:MM or -HH:MM")]
    InvalidUtcOffset(String),
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
