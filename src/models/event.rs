//! Inbound check-result events, as handed over by the external event
//! source.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{CheckId, Condition, StateEntry};

/// One check result (or action, for the pseudo-conditions) reported by the
/// ingestion interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The check the event concerns.
    pub check: CheckId,
    /// Reported condition, including the `acknowledgement`/`test`
    /// pseudo-conditions.
    pub condition: Condition,
    /// Report time, Unix seconds.
    pub timestamp: i64,
    /// One-line summary from the check execution.
    #[serde(default)]
    pub summary: String,
    /// Longer free-form detail text.
    #[serde(default)]
    pub details: String,
    /// Raw performance data, passed through untouched.
    #[serde(default)]
    pub perfdata: String,
    /// Tags to associate with the check; merged into the check's tag set
    /// on ingestion.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Event {
    /// The state-history entry this event maps to.
    pub fn to_state_entry(&self) -> StateEntry {
        StateEntry {
            condition: self.condition,
            timestamp: self.timestamp,
            summary: self.summary.clone(),
            details: self.details.clone(),
            perfdata: self.perfdata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_with_defaults() {
        let event: Event = serde_json::from_str(
            r#"{
                "check": {"entity": "web-01", "name": "HTTP"},
                "condition": "critical",
                "timestamp": 1700000000
            }"#,
        )
        .unwrap();
        assert_eq!(event.check, CheckId::new("web-01", "HTTP"));
        assert!(event.summary.is_empty());
        assert!(event.tags.is_empty());

        let entry = event.to_state_entry();
        assert_eq!(entry.condition, Condition::Critical);
        assert_eq!(entry.timestamp, 1_700_000_000);
    }
}
