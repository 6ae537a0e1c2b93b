//! Maintenance windows: intervals during which a check's failures are
//! suppressed from alerting and downtime accounting.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

/// Which of a check's two independent window collections a window lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceKind {
    /// Planned in advance; windows may overlap freely.
    Scheduled,
    /// Reactive / acknowledgement-driven; at most one window open at a time.
    Unscheduled,
}

impl fmt::Display for MaintenanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceKind::Scheduled => f.write_str("scheduled"),
            MaintenanceKind::Unscheduled => f.write_str("unscheduled"),
        }
    }
}

/// A half-open maintenance interval `[start_time, end_time)`.
///
/// Mutated only by the end/clear operation, which deletes it, shortens it,
/// or no-ops; it is never extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// Unique id of the window within its check.
    pub id: Uuid,
    /// Window start, Unix seconds (inclusive).
    pub start_time: i64,
    /// Window end, Unix seconds (exclusive). Greater than `start_time` at
    /// creation.
    pub end_time: i64,
    /// Human description of the maintenance.
    pub summary: String,
}

impl MaintenanceWindow {
    /// Creates a window, rejecting `end_time <= start_time`.
    pub fn new(
        start_time: i64,
        end_time: i64,
        summary: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if end_time <= start_time {
            return Err(ValidationError::WindowOrder { start: start_time, end: end_time });
        }
        Ok(Self { id: Uuid::new_v4(), start_time, end_time, summary: summary.into() })
    }

    /// True iff `t` falls within the window (`start_time <= t < end_time`).
    pub fn covers(&self, t: i64) -> bool {
        self.start_time <= t && t < self.end_time
    }

    /// True iff the window strictly overlaps the half-open interval
    /// `[from, to)`. A window that merely touches a boundary
    /// (`end_time == from` or `start_time == to`) does not overlap.
    pub fn intersects(&self, from: Option<i64>, to: Option<i64>) -> bool {
        let starts_before_to = to.map_or(true, |to| self.start_time < to);
        let ends_after_from = from.map_or(true, |from| self.end_time > from);
        starts_before_to && ends_after_from
    }

    /// Window length in seconds.
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_inverted_and_empty_windows() {
        assert!(MaintenanceWindow::new(100, 100, "empty").is_err());
        assert!(MaintenanceWindow::new(100, 50, "inverted").is_err());
        assert!(MaintenanceWindow::new(100, 101, "minimal").is_ok());
    }

    #[test]
    fn test_covers_is_half_open() {
        let window = MaintenanceWindow::new(100, 200, "upgrade").unwrap();
        assert!(window.covers(100));
        assert!(window.covers(199));
        assert!(!window.covers(200));
        assert!(!window.covers(99));
    }

    #[test]
    fn test_intersects_excludes_touching_boundaries() {
        let window = MaintenanceWindow::new(100, 200, "upgrade").unwrap();
        assert!(window.intersects(Some(150), Some(250)));
        assert!(window.intersects(Some(50), Some(150)));
        assert!(window.intersects(None, None));
        // touching is not overlapping
        assert!(!window.intersects(Some(200), Some(300)));
        assert!(!window.intersects(Some(0), Some(100)));
    }
}
