//! Push notification delivery.
//!
//! Delivery is an outside collaborator: the fan-out only needs
//! [`PushSender`]. [`HttpPushSender`] POSTs the JSON payload to the
//! subscription endpoint, which suits a relay that performs Web Push
//! encryption and VAPID signing on the server's behalf.

use std::time::Duration;

use reqwest::StatusCode;
use tracker_core::notify::{NotificationPayload, PushSubscription};
use tracker_core::remote::BoxFuture;

/// How long the push service may hold an undelivered notification (seconds)
const DEFAULT_TTL_SECS: u32 = 60 * 60;

/// Error types for push delivery
#[derive(Debug)]
pub enum PushError {
    /// The push service no longer knows the subscription (404/410)
    Gone(String),
    /// The push service refused the notification
    Rejected { status: u16, reason: String },
    /// The push service could not be reached
    Transport(String),
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::Gone(endpoint) => write!(f, "Push subscription expired: {}", endpoint),
            PushError::Rejected { status, reason } => {
                write!(f, "Push service rejected notification ({}): {}", status, reason)
            }
            PushError::Transport(e) => write!(f, "Failed to reach push service: {}", e),
        }
    }
}

impl std::error::Error for PushError {}

/// Delivers one notification to one subscription
pub trait PushSender: Send + Sync {
    fn send<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a NotificationPayload,
    ) -> BoxFuture<'a, Result<(), PushError>>;
}

/// Sends notifications as plain HTTPS POSTs to the subscription endpoint
pub struct HttpPushSender {
    client: reqwest::Client,
    ttl_secs: u32,
}

impl HttpPushSender {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_SECS)
    }

    pub fn with_ttl(ttl_secs: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, ttl_secs }
    }

    async fn post(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        let response = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", self.ttl_secs.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(PushError::Gone(subscription.endpoint.clone()))
            }
            status => {
                let reason = response.text().await.unwrap_or_default();
                Err(PushError::Rejected {
                    status: status.as_u16(),
                    reason,
                })
            }
        }
    }
}

impl Default for HttpPushSender {
    fn default() -> Self {
        Self::new()
    }
}

impl PushSender for HttpPushSender {
    fn send<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a NotificationPayload,
    ) -> BoxFuture<'a, Result<(), PushError>> {
        Box::pin(self.post(subscription, payload))
    }
}
