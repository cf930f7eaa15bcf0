use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;
use tracker_core::notify::{DEFAULT_TITLE, default_utc_offset, parse_utc_offset};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3030)
    pub port: u16,
    /// Database file path (default: ./tracker.db)
    pub database_path: PathBuf,
    /// CORS allowed origins (comma-separated, `*` for any)
    pub cors_origins: Vec<String>,
    /// SMTP configuration for unlock alerts
    pub smtp: SmtpConfig,
    /// Recipient of unlock alerts
    pub alert_email_to: Option<String>,
    /// Bearer secret required by the cron endpoint. Unset leaves it open.
    pub cron_secret: Option<String>,
    /// Wall clock that reminder times are written in (default: +09:00)
    pub notify_offset: FixedOffset,
    /// Title of reminder notifications
    pub notification_title: String,
    /// Run the reminder check in-process every minute
    pub internal_cron: bool,
}

/// SMTP configuration for email sending
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP host (e.g., smtp.resend.com)
    pub host: String,
    /// SMTP port (default: 465 for TLS)
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password or API key
    pub password: String,
    /// From email address
    pub from_email: String,
    /// From name (default: Tracker)
    pub from_name: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through `var`, which returns the value of a variable if set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("PORT")
            .unwrap_or_else(|| "3030".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_path =
            PathBuf::from(var("DATABASE_PATH").unwrap_or_else(|| "./tracker.db".to_string()));

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp = SmtpConfig {
            host: var("SMTP_HOST").unwrap_or_else(|| "smtp.resend.com".to_string()),
            port: var("SMTP_PORT")
                .unwrap_or_else(|| "465".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidSmtpPort)?,
            username: var("SMTP_USERNAME").unwrap_or_default(),
            password: var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|| "noreply@tracker.local".to_string()),
            from_name: var("SMTP_FROM_NAME").unwrap_or_else(|| "Tracker".to_string()),
        };

        let notify_offset = match non_empty("NOTIFY_UTC_OFFSET") {
            Some(raw) => {
                parse_utc_offset(&raw).map_err(|_| ConfigError::InvalidUtcOffset(raw))?
            }
            None => default_utc_offset(),
        };

        let internal_cron = matches!(
            var("INTERNAL_CRON").as_deref().map(str::trim),
            Some("1") | Some("true") | Some("yes")
        );

        Ok(Config {
            host,
            port,
            database_path,
            cors_origins,
            smtp,
            alert_email_to: non_empty("ALERT_EMAIL_TO"),
            cron_secret: non_empty("CRON_SECRET"),
            notify_offset,
            notification_title: non_empty("NOTIFICATION_TITLE")
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            internal_cron,
        })
    }

    /// Check if email sending is configured
    pub fn is_email_configured(&self) -> bool {
        !self.smtp.username.is_empty()
            && !self.smtp.password.is_empty()
            && self.alert_email_to.is_some()
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort,
    InvalidUtcOffset(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "Invalid PORT environment variable"),
            ConfigError::InvalidSmtpPort => write!(f, "Invalid SMTP_PORT environment variable"),
            ConfigError::InvalidUtcOffset(raw) => {
                write!(f, "Invalid NOTIFY_UTC_OFFSET '{}' (expected e.g. +09:00)", raw)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
