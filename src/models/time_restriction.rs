//! Recurring time-of-day windows restricting when a notification rule is
//! active, evaluated in the owning contact's timezone.

use chrono::{DateTime, Datelike, Days, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use super::ValidationError;

const SECS_PER_DAY: u32 = 86_400;

/// A minimal recurrence descriptor: on each listed weekday, an occurrence
/// starts `start_offset_secs` after local midnight and lasts
/// `duration_secs`. An occurrence may spill past midnight into the next
/// day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRestriction {
    /// Weekdays on which an occurrence starts.
    pub days: Vec<Weekday>,
    /// Seconds after local midnight at which each occurrence begins.
    pub start_offset_secs: u32,
    /// Occurrence length in seconds, at most one day.
    pub duration_secs: u32,
}

impl TimeRestriction {
    /// Checks the descriptor's internal consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.days.is_empty() {
            return Err(ValidationError::EmptyDays);
        }
        if self.start_offset_secs >= SECS_PER_DAY {
            return Err(ValidationError::OffsetOutOfRange(self.start_offset_secs));
        }
        if self.duration_secs == 0 || self.duration_secs > SECS_PER_DAY {
            return Err(ValidationError::DurationOutOfRange(self.duration_secs));
        }
        Ok(())
    }

    /// True iff `t` (Unix seconds) falls inside any occurrence of this
    /// restriction, evaluated in the timezone given by `offset`.
    pub fn occurs_at(&self, t: i64, offset: FixedOffset) -> bool {
        let Some(utc) = DateTime::from_timestamp(t, 0) else {
            return false;
        };
        let local = utc.with_timezone(&offset);
        let secs_into_day = i64::from(local.num_seconds_from_midnight());
        let start = i64::from(self.start_offset_secs);
        let duration = i64::from(self.duration_secs);

        // An occurrence starting today.
        if self.days.contains(&local.weekday())
            && secs_into_day >= start
            && secs_into_day < start + duration
        {
            return true;
        }

        // An occurrence that started yesterday and spills past midnight.
        let yesterday = local.date_naive() - Days::new(1);
        self.days.contains(&yesterday.weekday())
            && secs_into_day + i64::from(SECS_PER_DAY) >= start
            && secs_into_day + i64::from(SECS_PER_DAY) < start + duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(date: (i32, u32, u32), time: (u32, u32, u32)) -> i64 {
        let naive = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, time.2)
            .unwrap();
        Utc.from_utc_datetime(&naive).timestamp()
    }

    fn business_hours() -> TimeRestriction {
        TimeRestriction {
            days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            start_offset_secs: 8 * 3600,
            duration_secs: 10 * 3600,
        }
    }

    #[test]
    fn test_validate_rejects_bad_descriptors() {
        let mut tr = business_hours();
        tr.days.clear();
        assert!(matches!(tr.validate(), Err(ValidationError::EmptyDays)));

        let mut tr = business_hours();
        tr.start_offset_secs = 86_400;
        assert!(matches!(tr.validate(), Err(ValidationError::OffsetOutOfRange(_))));

        let mut tr = business_hours();
        tr.duration_secs = 0;
        assert!(matches!(tr.validate(), Err(ValidationError::DurationOutOfRange(0))));

        assert!(business_hours().validate().is_ok());
    }

    #[test]
    fn test_occurs_inside_and_outside_the_window() {
        let tr = business_hours();
        // 2024-01-10 is a Wednesday.
        assert!(tr.occurs_at(at((2024, 1, 10), (8, 0, 0)), utc()));
        assert!(tr.occurs_at(at((2024, 1, 10), (17, 59, 59)), utc()));
        assert!(!tr.occurs_at(at((2024, 1, 10), (18, 0, 0)), utc()));
        assert!(!tr.occurs_at(at((2024, 1, 10), (7, 59, 59)), utc()));
        // 2024-01-13 is a Saturday.
        assert!(!tr.occurs_at(at((2024, 1, 13), (9, 0, 0)), utc()));
    }

    #[test]
    fn test_occurrence_spilling_past_midnight() {
        // Friday 22:00 for six hours, running into Saturday 04:00.
        let tr = TimeRestriction {
            days: vec![Weekday::Fri],
            start_offset_secs: 22 * 3600,
            duration_secs: 6 * 3600,
        };
        // 2024-01-12 is a Friday, 2024-01-13 a Saturday.
        assert!(tr.occurs_at(at((2024, 1, 12), (23, 0, 0)), utc()));
        assert!(tr.occurs_at(at((2024, 1, 13), (3, 59, 59)), utc()));
        assert!(!tr.occurs_at(at((2024, 1, 13), (4, 0, 0)), utc()));
        assert!(!tr.occurs_at(at((2024, 1, 12), (21, 59, 59)), utc()));
    }

    #[test]
    fn test_occurrence_respects_timezone_offset() {
        // 09:00-17:00 Mondays in UTC+10.
        let tr = TimeRestriction {
            days: vec![Weekday::Mon],
            start_offset_secs: 9 * 3600,
            duration_secs: 8 * 3600,
        };
        let tz = FixedOffset::east_opt(10 * 3600).unwrap();
        // 2024-01-07 23:30 UTC is Monday 2024-01-08 09:30 in UTC+10.
        assert!(tr.occurs_at(at((2024, 1, 7), (23, 30, 0)), tz));
        // The same wall-clock instant is Sunday evening in UTC.
        assert!(!tr.occurs_at(at((2024, 1, 7), (23, 30, 0)), utc()));
    }
}
