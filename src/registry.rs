//! A static registry of the entity kinds the core mutates: each kind maps
//! to its payload validator and the lock set its mutations take. Built
//! once at startup; nothing is derived by reflection.

use serde_json::Value;
use std::fmt;

use crate::locks;
use crate::models::{Check, Contact, MaintenanceWindow, Medium, Rule, ValidationError};

/// The entity kinds known to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A monitored check.
    Check,
    /// A contact with rules and media.
    Contact,
    /// A delivery medium.
    Medium,
    /// A notification rule.
    Rule,
    /// A scheduled maintenance window.
    ScheduledMaintenance,
    /// An unscheduled maintenance window.
    UnscheduledMaintenance,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Check => "check",
            EntityKind::Contact => "contact",
            EntityKind::Medium => "medium",
            EntityKind::Rule => "rule",
            EntityKind::ScheduledMaintenance => "scheduled_maintenance",
            EntityKind::UnscheduledMaintenance => "unscheduled_maintenance",
        };
        f.write_str(name)
    }
}

/// What the registry knows about one entity kind.
pub struct EntityDescriptor {
    /// The kind described.
    pub kind: EntityKind,
    /// Validates a JSON payload claiming to be this kind.
    pub validate: fn(&Value) -> Result<(), ValidationError>,
    /// The locks a mutation of this kind must hold.
    pub lock_set: &'static [&'static str],
}

/// The registry table, built once at startup.
pub struct EntityRegistry {
    descriptors: Vec<EntityDescriptor>,
}

impl EntityRegistry {
    /// Builds the full table.
    pub fn new() -> Self {
        let descriptors = vec![
            EntityDescriptor {
                kind: EntityKind::Check,
                validate: validate_check,
                lock_set: &[locks::CHECK],
            },
            EntityDescriptor {
                kind: EntityKind::Contact,
                validate: validate_contact,
                lock_set: &[locks::CONTACT],
            },
            EntityDescriptor {
                kind: EntityKind::Medium,
                validate: validate_medium,
                lock_set: &[locks::CONTACT],
            },
            EntityDescriptor {
                kind: EntityKind::Rule,
                validate: validate_rule,
                lock_set: &[locks::CONTACT],
            },
            EntityDescriptor {
                kind: EntityKind::ScheduledMaintenance,
                validate: validate_window,
                lock_set: &[locks::CHECK, locks::MAINTENANCE],
            },
            EntityDescriptor {
                kind: EntityKind::UnscheduledMaintenance,
                validate: validate_window,
                lock_set: &[locks::CHECK, locks::MAINTENANCE],
            },
        ];
        Self { descriptors }
    }

    /// The descriptor for a kind.
    pub fn descriptor_for(&self, kind: EntityKind) -> &EntityDescriptor {
        // the table is total over EntityKind by construction
        self.descriptors
            .iter()
            .find(|d| d.kind == kind)
            .unwrap_or(&self.descriptors[0])
    }

    /// Validates a payload against its claimed kind.
    pub fn validate(&self, kind: EntityKind, payload: &Value) -> Result<(), ValidationError> {
        (self.descriptor_for(kind).validate)(payload)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_check(payload: &Value) -> Result<(), ValidationError> {
    serde_json::from_value::<Check>(payload.clone())
        .map(|_| ())
        .map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn validate_contact(payload: &Value) -> Result<(), ValidationError> {
    let contact: Contact = serde_json::from_value(payload.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    contact.validate()
}

fn validate_medium(payload: &Value) -> Result<(), ValidationError> {
    let medium: Medium = serde_json::from_value(payload.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    medium.validate()
}

fn validate_rule(payload: &Value) -> Result<(), ValidationError> {
    let rule: Rule = serde_json::from_value(payload.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    rule.validate()
}

fn validate_window(payload: &Value) -> Result<(), ValidationError> {
    let window: MaintenanceWindow = serde_json::from_value(payload.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    if window.end_time <= window.start_time {
        return Err(ValidationError::WindowOrder {
            start: window.start_time,
            end: window.end_time,
        });
    }
    Ok(())
}
