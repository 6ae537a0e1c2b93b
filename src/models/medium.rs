//! Notification media: the delivery channels configured for a contact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::ValidationError;

/// The transport a medium delivers through. One delivery queue and worker
/// exists per transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// SMTP delivery.
    Email,
    /// SMS gateway delivery.
    Sms,
    /// Chat (XMPP) delivery.
    Jabber,
    /// Incident-vendor (paging) delivery.
    Pagerduty,
    /// Generic outbound HTTP delivery.
    Webhook,
}

impl Transport {
    /// Every transport, in queue-creation order.
    pub const ALL: [Transport; 5] = [
        Transport::Email,
        Transport::Sms,
        Transport::Jabber,
        Transport::Pagerduty,
        Transport::Webhook,
    ];

    /// True for transports that require a per-medium delivery interval.
    /// Paging transports manage their own escalation and take none.
    pub fn throttled(&self) -> bool {
        !matches!(self, Transport::Pagerduty)
    }

    /// The canonical lowercase name of the transport.
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Email => "email",
            Transport::Sms => "sms",
            Transport::Jabber => "jabber",
            Transport::Pagerduty => "pagerduty",
            Transport::Webhook => "webhook",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised transport name.
#[derive(Debug, Error)]
#[error("Unrecognised transport '{0}'")]
pub struct ParseTransportError(pub String);

impl FromStr for Transport {
    type Err = ParseTransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Transport::Email),
            "sms" => Ok(Transport::Sms),
            "jabber" => Ok(Transport::Jabber),
            "pagerduty" => Ok(Transport::Pagerduty),
            "webhook" => Ok(Transport::Webhook),
            other => Err(ParseTransportError(other.to_string())),
        }
    }
}

/// A delivery address belonging to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medium {
    /// Unique id of the medium.
    pub id: Uuid,
    /// The transport this medium delivers through.
    pub transport: Transport,
    /// Transport-specific address (mailbox, phone number, URL, ...).
    pub address: String,
    /// Minimum seconds between repeat problem alerts for the same check
    /// and condition. Required for throttled transports, forbidden for the
    /// rest.
    #[serde(default)]
    pub interval: Option<u32>,
    /// Number of simultaneously alerting checks at which delivery switches
    /// to rollup messages. `None` disables rollup for this medium.
    #[serde(default)]
    pub rollup_threshold: Option<u32>,
}

impl Medium {
    /// Creates a medium with a fresh id and no rollup threshold.
    pub fn new(transport: Transport, address: impl Into<String>, interval: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
            address: address.into(),
            interval,
            rollup_threshold: None,
        }
    }

    /// Validates address presence and the interval rule for the transport.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.address.is_empty() {
            return Err(ValidationError::EmptyAddress(self.transport));
        }
        match (self.transport.throttled(), self.interval) {
            (true, Some(interval)) if interval > 0 => Ok(()),
            (true, _) => Err(ValidationError::IntervalRequired(self.transport)),
            (false, None) => Ok(()),
            (false, Some(_)) => Err(ValidationError::IntervalForbidden(self.transport)),
        }
    }
}
