//! Contacts: the people (or escalation targets) that own notification
//! rules and delivery media.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Medium, Rule, Transport, ValidationError};

/// A notification recipient. A contact exclusively owns its rules and
/// media; rules reference checks only through tag/entity matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique id of the contact.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// The contact's timezone as a fixed UTC offset in seconds, used to
    /// localize rule time restrictions. Named-zone/DST resolution is a
    /// boundary concern.
    #[serde(default)]
    pub utc_offset_secs: i32,
    /// The contact's notification rules. An empty list behaves as a single
    /// synthesized general rule over all of the contact's media.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// The contact's delivery media.
    #[serde(default)]
    pub media: Vec<Medium>,
}

impl Contact {
    /// Creates a contact in UTC with no rules or media.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            utc_offset_secs: 0,
            rules: Vec::new(),
            media: Vec::new(),
        }
    }

    /// The contact's timezone. Falls back to UTC if the stored offset is
    /// out of range (validation rejects such offsets up front).
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    /// The medium configured for `transport`, if any.
    pub fn medium_for(&self, transport: Transport) -> Option<&Medium> {
        self.media.iter().find(|m| m.transport == transport)
    }

    /// The set of transports the contact has media for.
    pub fn transports(&self) -> std::collections::BTreeSet<Transport> {
        self.media.iter().map(|m| m.transport).collect()
    }

    /// Validates the contact's offset, rules and media.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if FixedOffset::east_opt(self.utc_offset_secs).is_none() {
            return Err(ValidationError::UtcOffsetOutOfRange(self.utc_offset_secs));
        }
        for rule in &self.rules {
            rule.validate()?;
        }
        for medium in &self.media {
            medium.validate()?;
        }
        Ok(())
    }
}
