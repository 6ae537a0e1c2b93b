//! Resolved delivery tuples and delivery-outcome bookkeeping events.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{CheckId, Condition, Severity, Transport};

/// Classification of a notification, derived from the condition
/// transition that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A check entered or re-reported a failing condition.
    Problem,
    /// A failing check returned to `ok`.
    Recovery,
    /// A failure was acknowledged.
    Acknowledgement,
    /// A test notification was requested.
    Test,
}

impl NotificationKind {
    /// The canonical lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Problem => "problem",
            NotificationKind::Recovery => "recovery",
            NotificationKind::Acknowledgement => "acknowledgement",
            NotificationKind::Test => "test",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved `(contact, medium, message)` tuple, ready for a
/// delivery queue. One alert is enqueued per transport per contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// The contact being notified.
    pub contact_id: Uuid,
    /// The contact's display name, for message rendering.
    pub contact_name: String,
    /// The transport to deliver through.
    pub transport: Transport,
    /// The medium's delivery address.
    pub address: String,
    /// The check whose transition produced this alert.
    pub check: CheckId,
    /// The condition reported by the transition.
    pub condition: Condition,
    /// The notification severity the transition resolved to.
    pub severity: Severity,
    /// Problem, recovery, acknowledgement or test.
    pub kind: NotificationKind,
    /// True when the medium's rollup threshold has been reached and the
    /// message should batch the alerting checks rather than report one.
    pub rollup: bool,
    /// Number of checks currently alerting on this medium, for rollup
    /// rendering.
    pub alerting_count: usize,
    /// Summary text from the transition.
    pub summary: String,
    /// Detail text from the transition.
    pub details: String,
    /// Transition time, Unix seconds.
    pub time: i64,
}

/// Outcome of a delivery attempt, reported back by a channel worker so the
/// router can update its last-sent and rollup bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    /// The contact the alert was addressed to.
    pub contact_id: Uuid,
    /// The transport the alert went out on.
    pub transport: Transport,
    /// The check the alert concerned.
    pub check: CheckId,
    /// The condition the alert carried.
    pub condition: Condition,
    /// The kind of notification delivered.
    pub kind: NotificationKind,
    /// Delivery time, Unix seconds.
    pub time: i64,
    /// Whether the gateway reported success.
    pub success: bool,
}

impl SendOutcome {
    /// Builds the outcome for a delivery attempt of `alert` at `time`.
    pub fn for_alert(alert: &Alert, time: i64, success: bool) -> Self {
        Self {
            contact_id: alert.contact_id,
            transport: alert.transport,
            check: alert.check.clone(),
            condition: alert.condition,
            kind: alert.kind,
            time,
            success,
        }
    }
}
