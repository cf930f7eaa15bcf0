//! Reminder fan-out.
//!
//! Runs once per minute (from the cron endpoint or the internal ticker):
//! every enabled schedule whose `HH:MM` matches the current minute is sent
//! to every stored push subscription.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracker_core::error::Result;
use tracker_core::notify::{
    NotificationPayload, SCHEDULES_KEY, SUBSCRIPTIONS_KEY, due_schedules, parse_schedules,
    parse_subscriptions,
};
use tracker_core::remote::RemoteStore;

use crate::push::{PushError, PushSender};

/// Result of one fan-out run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchOutcome {
    /// Notifications accepted by the push service
    pub sent: usize,
    /// Notifications that failed
    pub failed: usize,
    /// Why nothing was attempted, if so
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchOutcome {
    fn skipped(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::default()
        }
    }
}

/// Send the reminders due at `now`, read in the wall clock of `offset`
pub async fn dispatch_due(
    store: &dyn RemoteStore,
    sender: &dyn PushSender,
    now: DateTime<Utc>,
    offset: FixedOffset,
    title: &str,
) -> Result<DispatchOutcome> {
    let Some(stored) = store.fetch(SCHEDULES_KEY).await? else {
        return Ok(DispatchOutcome::skipped("No schedules found"));
    };
    let schedules = match parse_schedules(&stored.value) {
        Ok(schedules) => schedules,
        Err(e) => {
            warn!("Stored schedules are invalid: {}", e);
            return Ok(DispatchOutcome::skipped("No schedules found"));
        }
    };

    let stored = store.fetch(SUBSCRIPTIONS_KEY).await?;
    let subscriptions = parse_subscriptions(stored.as_ref().map(|e| &e.value));
    if subscriptions.is_empty() {
        return Ok(DispatchOutcome::skipped("No push subscription found"));
    }

    let due = due_schedules(&schedules, now, offset);
    debug!(
        "{} of {} schedules due at {}",
        due.len(),
        schedules.len(),
        now.with_timezone(&offset).format("%H:%M")
    );

    let mut outcome = DispatchOutcome::default();
    for schedule in due {
        let payload = NotificationPayload {
            title: title.to_string(),
            body: schedule.message.clone(),
        };
        for subscription in &subscriptions {
            match sender.send(subscription, &payload).await {
                Ok(()) => outcome.sent += 1,
                Err(e @ PushError::Gone(_)) => {
                    info!("{}", e);
                    outcome.failed += 1;
                }
                Err(e) => {
                    warn!("Failed to send reminder: {}", e);
                    outcome.failed += 1;
                }
            }
        }
    }

    Ok(outcome)
}
