//! Notification rules: per-contact routing of severities to media, scoped
//! by entity names, tags and recurring time restrictions.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{Severity, TimeRestriction, Transport, ValidationError};

/// A notification rule owned by a contact.
///
/// Empty `entities` and `tags` sets match every check. A rule with neither
/// selector nor any time restriction is "general": the always-applicable
/// fallback guaranteeing default routing behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique id of the rule.
    pub id: Uuid,
    /// Entity names this rule is scoped to; empty matches all.
    #[serde(default)]
    pub entities: BTreeSet<String>,
    /// Tags this rule is scoped to; empty matches all, otherwise the rule
    /// matches only checks carrying every listed tag.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Recurring windows during which the rule is active; empty means
    /// always active.
    #[serde(default)]
    pub time_restrictions: Vec<TimeRestriction>,
    /// Media notified for warning-severity transitions.
    #[serde(default)]
    pub warning_media: BTreeSet<Transport>,
    /// Media notified for critical-severity transitions.
    #[serde(default)]
    pub critical_media: BTreeSet<Transport>,
    /// Suppress all warning notifications matched by this rule.
    #[serde(default)]
    pub warning_blackhole: bool,
    /// Suppress all critical notifications matched by this rule.
    #[serde(default)]
    pub critical_blackhole: bool,
}

impl Rule {
    /// The synthesized general fallback rule: no selectors, no time
    /// restrictions, every given medium for both severities.
    pub fn general(media: BTreeSet<Transport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entities: BTreeSet::new(),
            tags: BTreeSet::new(),
            time_restrictions: Vec::new(),
            warning_media: media.clone(),
            critical_media: media,
            warning_blackhole: false,
            critical_blackhole: false,
        }
    }

    /// True if the rule names at least one entity or tag.
    pub fn is_specific(&self) -> bool {
        !self.entities.is_empty() || !self.tags.is_empty()
    }

    /// True for the fallback shape: no selectors and no time restrictions.
    pub fn is_general(&self) -> bool {
        !self.is_specific() && self.time_restrictions.is_empty()
    }

    /// True if `entity_name` is within the rule's entity scope.
    pub fn match_entity(&self, entity_name: &str) -> bool {
        self.entities.is_empty() || self.entities.contains(entity_name)
    }

    /// True if the rule's tags are a subset of the check's tags.
    pub fn match_tags(&self, check_tags: &BTreeSet<String>) -> bool {
        self.tags.is_subset(check_tags)
    }

    /// True if `time` falls within any of the rule's time restrictions,
    /// evaluated in the contact's timezone. No restrictions means always
    /// active.
    pub fn active_at(&self, time: i64, timezone: FixedOffset) -> bool {
        self.time_restrictions.is_empty()
            || self.time_restrictions.iter().any(|tr| tr.occurs_at(time, timezone))
    }

    /// The blackhole flag for the given severity.
    pub fn blackhole(&self, severity: Severity) -> bool {
        match severity {
            Severity::Warning => self.warning_blackhole,
            Severity::Critical => self.critical_blackhole,
        }
    }

    /// The media set configured for the given severity, or empty if the
    /// severity is blackholed.
    pub fn media_for_severity(&self, severity: Severity) -> BTreeSet<Transport> {
        if self.blackhole(severity) {
            return BTreeSet::new();
        }
        match severity {
            Severity::Warning => self.warning_media.clone(),
            Severity::Critical => self.critical_media.clone(),
        }
    }

    /// Validates every time restriction carried by the rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for restriction in &self.time_restrictions {
            restriction.validate()?;
        }
        Ok(())
    }
}
