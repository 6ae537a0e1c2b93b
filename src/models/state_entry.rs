//! A single immutable entry in a check's state history.

use serde::{Deserialize, Serialize};

use super::Condition;

/// One reported state of a check. Immutable once written; timestamps are
/// non-decreasing within a check's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// The reported condition.
    pub condition: Condition,
    /// Report time, Unix seconds.
    pub timestamp: i64,
    /// One-line human summary from the check execution.
    pub summary: String,
    /// Longer free-form detail text.
    #[serde(default)]
    pub details: String,
    /// Raw performance data string, passed through untouched.
    #[serde(default)]
    pub perfdata: String,
}

impl StateEntry {
    /// Creates an entry with empty details and perfdata.
    pub fn new(condition: Condition, timestamp: i64, summary: impl Into<String>) -> Self {
        Self {
            condition,
            timestamp,
            summary: summary.into(),
            details: String::new(),
            perfdata: String::new(),
        }
    }
}
