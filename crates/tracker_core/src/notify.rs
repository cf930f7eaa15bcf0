//! Notification schedules and push subscriptions.
//!
//! Both live in the remote store like any other feature state:
//!
//! - [`SCHEDULES_KEY`] holds an array of [`NotificationSchedule`].
//! - [`SUBSCRIPTIONS_KEY`] holds an array of Web Push [`PushSubscription`].
//!   Older clients stored a single subscription object there, which
//!   [`parse_subscriptions`] still accepts.
//!
//! A periodic job calls [`due_schedules`] once a minute and sends each due
//! message to every stored subscription. Schedule times are wall-clock
//! `HH:MM` in one fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrackerError};

/// Key holding the notification schedules.
pub const SCHEDULES_KEY: &str = "notification_schedules";

/// Key holding the push subscriptions.
pub const SUBSCRIPTIONS_KEY: &str = "push_subscriptions";

/// Title used for notifications unless the host configures another.
pub const DEFAULT_TITLE: &str = "Personal Tracker";

/// Offset used for schedule times unless the host configures another (UTC+9).
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// A daily reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSchedule {
    /// Wall-clock time, `HH:MM`
    pub time: String,
    /// Notification body
    pub message: String,
    /// Disabled schedules are kept but never fire
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NotificationSchedule {
    /// Parse the schedule's `HH:MM` time.
    pub fn parse_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .map_err(|_| TrackerError::InvalidScheduleTime(self.time.clone()))
    }

    /// Whether this schedule fires during the minute containing `local`.
    pub fn is_due(&self, local: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        match self.parse_time() {
            Ok(time) => time.hour() == local.hour() && time.minute() == local.minute(),
            Err(_) => false,
        }
    }
}

/// Encryption keys of a push subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushKeys {
    /// Client public key
    pub p256dh: String,
    /// Authentication secret
    pub auth: String,
}

/// A Web Push subscription as registered by a browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push service URL; identifies the subscription
    pub endpoint: String,
    /// Expiry in milliseconds since the epoch, if the push service set one
    #[serde(
        rename = "expirationTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_time: Option<i64>,
    /// Payload encryption keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<PushKeys>,
}

/// JSON body delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
}

/// Read the stored subscriptions, accepting the legacy single-object form.
///
/// Entries that are not valid subscriptions are skipped.
pub fn parse_subscriptions(stored: Option<&Value>) -> Vec<PushSubscription> {
    let items: Vec<Value> = match stored {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single.clone()],
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                log::warn!("Skipping invalid push subscription: {}", e);
                None
            }
        })
        .collect()
}

/// Add `new` to the stored subscriptions unless its endpoint is already there.
///
/// Returns the full list to store back.
pub fn merge_subscription(stored: Option<&Value>, new: PushSubscription) -> Vec<PushSubscription> {
    let mut subscriptions = parse_subscriptions(stored);
    if !subscriptions.iter().any(|s| s.endpoint == new.endpoint) {
        subscriptions.push(new);
    }
    subscriptions
}

/// Parse a stored schedule array.
pub fn parse_schedules(value: &Value) -> Result<Vec<NotificationSchedule>> {
    let schedules: Vec<NotificationSchedule> = serde_json::from_value(value.clone())?;
    for schedule in &schedules {
        schedule.parse_time()?;
    }
    Ok(schedules)
}

/// Schedules firing at `now`, evaluated in the wall clock of `offset`.
pub fn due_schedules<'a>(
    schedules: &'a [NotificationSchedule],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Vec<&'a NotificationSchedule> {
    let local = now.with_timezone(&offset).time();
    schedules.iter().filter(|s| s.is_due(local)).collect()
}

/// Parse a UTC offset written as `+HH:MM`, `-HH:MM`, `+HH` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let invalid = || TrackerError::InvalidUtcOffset(raw.to_string());
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// The default schedule offset (UTC+9).
pub fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}
