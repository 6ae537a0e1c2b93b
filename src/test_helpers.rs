//! A set of builders for constructing model instances in tests.

use std::collections::BTreeSet;

use crate::models::{
    Check, CheckId, Condition, Contact, Event, Medium, Rule, StateEntry, TimeRestriction,
    Transport,
};

/// A builder for creating `Check` instances for testing.
#[derive(Debug, Default, Clone)]
pub struct CheckBuilder {
    entity: Option<String>,
    name: Option<String>,
    tags: BTreeSet<String>,
    disabled: bool,
}

impl CheckBuilder {
    /// Creates a new `CheckBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity name.
    pub fn entity(mut self, entity: &str) -> Self {
        self.entity = Some(entity.to_string());
        self
    }

    /// Sets the check name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    /// Builds the check as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Builds the `Check` with the provided or default values.
    pub fn build(self) -> Check {
        let id = CheckId::new(
            self.entity.unwrap_or_else(|| "web-01".to_string()),
            self.name.unwrap_or_else(|| "HTTP".to_string()),
        );
        let mut check = Check::new(id, self.tags);
        check.enabled = !self.disabled;
        check
    }
}

/// A builder for creating `Contact` instances for testing.
#[derive(Debug, Default, Clone)]
pub struct ContactBuilder {
    name: Option<String>,
    utc_offset_secs: i32,
    rules: Vec<Rule>,
    media: Vec<Medium>,
}

impl ContactBuilder {
    /// Creates a new `ContactBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the contact's display name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the contact's UTC offset in seconds.
    pub fn utc_offset_secs(mut self, offset: i32) -> Self {
        self.utc_offset_secs = offset;
        self
    }

    /// Adds a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds an email medium with a 15-minute interval.
    pub fn email(mut self, address: &str) -> Self {
        self.media.push(Medium::new(Transport::Email, address, Some(900)));
        self
    }

    /// Adds an SMS medium with a 5-minute interval.
    pub fn sms(mut self, address: &str) -> Self {
        self.media.push(Medium::new(Transport::Sms, address, Some(300)));
        self
    }

    /// Adds an arbitrary medium.
    pub fn medium(mut self, medium: Medium) -> Self {
        self.media.push(medium);
        self
    }

    /// Builds the `Contact` with the provided or default values.
    pub fn build(self) -> Contact {
        let mut contact = Contact::new(self.name.unwrap_or_else(|| "Ada".to_string()));
        contact.utc_offset_secs = self.utc_offset_secs;
        contact.rules = self.rules;
        contact.media = self.media;
        contact
    }
}

/// A builder for creating `Rule` instances for testing.
#[derive(Debug, Default, Clone)]
pub struct RuleBuilder {
    entities: BTreeSet<String>,
    tags: BTreeSet<String>,
    time_restrictions: Vec<TimeRestriction>,
    warning_media: BTreeSet<Transport>,
    critical_media: BTreeSet<Transport>,
    warning_blackhole: bool,
    critical_blackhole: bool,
}

impl RuleBuilder {
    /// Creates a new `RuleBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes the rule to an entity name.
    pub fn entity(mut self, entity: &str) -> Self {
        self.entities.insert(entity.to_string());
        self
    }

    /// Scopes the rule to a tag.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    /// Adds a time restriction.
    pub fn time_restriction(mut self, restriction: TimeRestriction) -> Self {
        self.time_restrictions.push(restriction);
        self
    }

    /// Routes warning-severity alerts to a transport.
    pub fn warning_medium(mut self, transport: Transport) -> Self {
        self.warning_media.insert(transport);
        self
    }

    /// Routes critical-severity alerts to a transport.
    pub fn critical_medium(mut self, transport: Transport) -> Self {
        self.critical_media.insert(transport);
        self
    }

    /// Routes both severities to a transport.
    pub fn medium(self, transport: Transport) -> Self {
        self.warning_medium(transport).critical_medium(transport)
    }

    /// Blackholes warning-severity alerts.
    pub fn warning_blackhole(mut self) -> Self {
        self.warning_blackhole = true;
        self
    }

    /// Blackholes critical-severity alerts.
    pub fn critical_blackhole(mut self) -> Self {
        self.critical_blackhole = true;
        self
    }

    /// Builds the `Rule` with the provided or default values.
    pub fn build(self) -> Rule {
        let mut rule = Rule::general(BTreeSet::new());
        rule.entities = self.entities;
        rule.tags = self.tags;
        rule.time_restrictions = self.time_restrictions;
        rule.warning_media = self.warning_media;
        rule.critical_media = self.critical_media;
        rule.warning_blackhole = self.warning_blackhole;
        rule.critical_blackhole = self.critical_blackhole;
        rule
    }
}

/// A builder for creating `Event` instances for testing.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    check: CheckId,
    condition: Condition,
    timestamp: i64,
    summary: String,
    tags: BTreeSet<String>,
}

impl EventBuilder {
    /// Creates a builder reporting the given condition at the given time.
    pub fn new(condition: Condition, timestamp: i64) -> Self {
        Self {
            check: CheckId::new("web-01", "HTTP"),
            condition,
            timestamp,
            summary: "state".to_string(),
            tags: BTreeSet::new(),
        }
    }

    /// Sets the check the event concerns.
    pub fn check(mut self, check: CheckId) -> Self {
        self.check = check;
        self
    }

    /// Sets the summary.
    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    /// Builds the `Event`.
    pub fn build(self) -> Event {
        Event {
            check: self.check,
            condition: self.condition,
            timestamp: self.timestamp,
            summary: self.summary,
            details: String::new(),
            perfdata: String::new(),
            tags: self.tags,
        }
    }
}

/// Shorthand for a state entry with the given condition and timestamp.
pub fn entry(condition: Condition, timestamp: i64) -> StateEntry {
    StateEntry::new(condition, timestamp, "state")
}
