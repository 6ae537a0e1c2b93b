//! Check conditions and the severity scale derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The reported health state of a check at a point in time.
///
/// `Acknowledgement` and `Test` are pseudo-conditions: they classify
/// notifications but never act as outage boundaries and never enter the
/// healthy/failing walk of the report engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// The check is healthy.
    Ok,
    /// The check is degraded but functioning.
    Warning,
    /// The check is failing.
    Critical,
    /// The check reported an unrecognised or indeterminate state.
    Unknown,
    /// A human or automation acknowledged the current failure.
    Acknowledgement,
    /// A test notification was requested.
    Test,
}

impl Condition {
    /// True for the single healthy condition, `ok`.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Condition::Ok)
    }

    /// True for the pseudo-conditions used only to classify notifications.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Condition::Acknowledgement | Condition::Test)
    }

    /// True for any real condition other than `ok`.
    pub fn is_failing(&self) -> bool {
        !self.is_healthy() && !self.is_pseudo()
    }

    /// The notification severity this condition maps to, if any.
    ///
    /// `ok` and `acknowledgement` carry no severity of their own; the router
    /// derives theirs from the failure they resolve.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Condition::Warning => Some(Severity::Warning),
            Condition::Critical | Condition::Unknown | Condition::Test => Some(Severity::Critical),
            Condition::Ok | Condition::Acknowledgement => None,
        }
    }

    /// The canonical lowercase name of the condition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Ok => "ok",
            Condition::Warning => "warning",
            Condition::Critical => "critical",
            Condition::Unknown => "unknown",
            Condition::Acknowledgement => "acknowledgement",
            Condition::Test => "test",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised condition name.
#[derive(Debug, Error)]
#[error("Unrecognised condition '{0}'")]
pub struct ParseConditionError(pub String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Condition::Ok),
            "warning" => Ok(Condition::Warning),
            "critical" => Ok(Condition::Critical),
            "unknown" => Ok(Condition::Unknown),
            "acknowledgement" => Ok(Condition::Acknowledgement),
            "test" => Ok(Condition::Test),
            other => Err(ParseConditionError(other.to_string())),
        }
    }
}

/// Notification severity, the key into a rule's per-severity media sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degraded service; routed through a rule's warning media.
    Warning,
    /// Failed service; routed through a rule's critical media.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}
