//! The `Check` model: a named, monitored unit of health on an entity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Identity of a check: the entity it runs on plus the check name,
/// displayed as `entity:name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckId {
    /// Name of the monitored entity (host, service endpoint, ...).
    pub entity: String,
    /// Name of the check on that entity (e.g. "PING", "HTTP").
    pub name: String,
}

impl CheckId {
    /// Creates a check id from an entity name and a check name.
    pub fn new(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self { entity: entity.into(), name: name.into() }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.name)
    }
}

/// Error returned when parsing a check id that is not `entity:name`.
#[derive(Debug, Error)]
#[error("Check id '{0}' is not of the form 'entity:name'")]
pub struct ParseCheckIdError(pub String);

impl FromStr for CheckId {
    type Err = ParseCheckIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((entity, name)) if !entity.is_empty() && !name.is_empty() => {
                Ok(CheckId::new(entity, name))
            }
            _ => Err(ParseCheckIdError(s.to_string())),
        }
    }
}

/// A monitored check.
///
/// A check owns its state history and its maintenance windows exclusively;
/// no other entity writes them. It is created on first report (or explicit
/// registration) and never destroyed while referenced by history; disabling
/// stops evaluation but preserves history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// The check's identity.
    pub id: CheckId,
    /// Free-form tags used for notification rule matching.
    pub tags: BTreeSet<String>,
    /// Disabled checks are excluded from failure and downtime evaluation.
    pub enabled: bool,
    /// Derived: true iff the latest recorded condition is failing.
    pub failing: bool,
    /// Opaque token correlating acknowledgements with the failure they
    /// target; refreshed each time the check enters a failing state.
    pub ack_hash: String,
}

impl Check {
    /// Creates an enabled, healthy check with the given tags.
    pub fn new(id: CheckId, tags: BTreeSet<String>) -> Self {
        Self { id, tags, enabled: true, failing: false, ack_hash: fresh_ack_hash() }
    }

    /// Replaces the acknowledgement hash with a fresh token.
    pub fn refresh_ack_hash(&mut self) {
        self.ack_hash = fresh_ack_hash();
    }
}

fn fresh_ack_hash() -> String {
    let hash = Uuid::new_v4().simple().to_string();
    hash[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id_display_and_parse() {
        let id = CheckId::new("app-01.example.com", "PING");
        assert_eq!(id.to_string(), "app-01.example.com:PING");
        assert_eq!("app-01.example.com:PING".parse::<CheckId>().unwrap(), id);
    }

    #[test]
    fn test_check_id_parse_splits_on_first_colon() {
        let id = "web:HTTP:443".parse::<CheckId>().unwrap();
        assert_eq!(id.entity, "web");
        assert_eq!(id.name, "HTTP:443");
    }

    #[test]
    fn test_check_id_parse_rejects_missing_parts() {
        assert!("no-colon".parse::<CheckId>().is_err());
        assert!(":PING".parse::<CheckId>().is_err());
        assert!("host:".parse::<CheckId>().is_err());
    }

    #[test]
    fn test_new_check_defaults() {
        let check = Check::new(CheckId::new("db", "SSH"), BTreeSet::new());
        assert!(check.enabled);
        assert!(!check.failing);
        assert_eq!(check.ack_hash.len(), 8);
    }

    #[test]
    fn test_refresh_ack_hash_changes_token() {
        let mut check = Check::new(CheckId::new("db", "SSH"), BTreeSet::new());
        let before = check.ack_hash.clone();
        check.refresh_ack_hash();
        assert_ne!(check.ack_hash, before);
    }
}
