use crate::config::Config;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{PoolConfig, authentication::Credentials, client::Tls},
};
use std::sync::Arc;
use tracing::{error, info};

/// Email service for unlock alerts
pub struct EmailService {
    config: Arc<Config>,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

/// Error types for email operations
#[derive(Debug)]
pub enum EmailError {
    /// Email service not configured
    NotConfigured,
    /// Failed to build email
    BuildError(String),
    /// Failed to send email
    SendError(String),
}

impl std::fmt::Display for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailError::NotConfigured => write!(f, "Email service not configured"),
            EmailError::BuildError(e) => write!(f, "Failed to build email: {}", e),
            EmailError::SendError(e) => write!(f, "Failed to send email: {}", e),
        }
    }
}

impl std::error::Error for EmailError {}

impl EmailService {
    /// Create a new EmailService
    pub fn new(config: Arc<Config>) -> Self {
        let transport = if config.is_email_configured() {
            match Self::create_transport(&config) {
                Ok(t) => {
                    info!(
                        "Email service configured with SMTP host: {}",
                        config.smtp.host
                    );
                    Some(t)
                }
                Err(e) => {
                    error!("Failed to configure email transport: {}", e);
                    None
                }
            }
        } else {
            info!("Email service not configured (SMTP credentials or ALERT_EMAIL_TO missing)");
            None
        };

        Self { config, transport }
    }

    fn create_transport(
        config: &Config,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
        let creds = Credentials::new(config.smtp.username.clone(), config.smtp.password.clone());

        // Use STARTTLS for port 587, implicit TLS for port 465
        let builder = if config.smtp.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.host)?
                .port(config.smtp.port)
                .tls(Tls::Wrapper(
                    lettre::transport::smtp::client::TlsParameters::new(config.smtp.host.clone())?,
                ))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp.host)?
                .port(config.smtp.port)
        };

        Ok(builder
            .credentials(creds)
            .pool_config(PoolConfig::new().max_size(2))
            .build())
    }

    /// Check if email service is configured
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Email the owner that the dashboard was unlocked
    pub async fn send_unlock_alert(&self, when: &str, device: &str) -> Result<(), EmailError> {
        let transport = self.transport.as_ref().ok_or(EmailError::NotConfigured)?;
        let to_email = self
            .config
            .alert_email_to
            .as_deref()
            .ok_or(EmailError::NotConfigured)?;

        let from = format!(
            "{} <{}>",
            self.config.smtp.from_name, self.config.smtp.from_email
        );

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::BuildError(format!("{}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::BuildError(format!("{}", e)))?)
            .subject("Login Alert")
            .header(ContentType::TEXT_HTML)
            .body(build_unlock_alert_body(when, device))
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        info!("Unlock alert sent to {}", to_email);
        Ok(())
    }
}

fn build_unlock_alert_body(when: &str, device: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Login Alert</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background-color: #f9f9f9; border-radius: 8px; padding: 30px;">
        <h2 style="margin-top: 0; color: #1a1a1a;">Your dashboard was unlocked</h2>
        <p><strong>Time:</strong> {}</p>
        <p><strong>Device:</strong> {}</p>
        <p style="color: #666; font-size: 14px;">If this wasn't you, change your passcode.</p>
    </div>
</body>
</html>"#,
        escape_html(when),
        escape_html(device)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
