//! Client configuration.
//!
//! This module provides the [`Config`] struct which stores where the client
//! finds its server and where it keeps its local cache. Configuration is
//! persisted as TOML (typically at `~/.config/tracker/config.toml` on Unix
//! systems).
//!
//! # Example
//!
//! ```ignore
//! use tracker_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.server_url = Some("http://localhost:3030".to_string());
//! config.save()?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};

/// User-configurable client settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tracker server URL (e.g., "http://localhost:3030")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Directory for the local cache.
    /// Falls back to the platform cache directory if not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Create a config pointing at `server_url`.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: Some(server_url.into()),
            cache_dir: None,
        }
    }

    /// The configured server URL without a trailing slash.
    pub fn server_url(&self) -> Result<&str> {
        self.server_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or(TrackerError::NoServerConfigured)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TrackerError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| TrackerError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

// ============================================================================
// Native-only implementation (not available in WASM)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl Config {
    /// Get the config file path (~/.config/tracker/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tracker").join("config.toml"))
    }

    /// Load config from default location, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }

        Ok(Config::default())
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(TrackerError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Directory holding the local cache (~/.cache/tracker unless overridden)
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        dirs::cache_dir()
            .map(|dir| dir.join("tracker"))
            .ok_or(TrackerError::NoConfigDir)
    }
}
