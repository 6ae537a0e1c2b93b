//! This module contains the data models for the Vigil monitoring core.

pub mod alert;
pub mod check;
pub mod condition;
pub mod contact;
pub mod event;
pub mod maintenance;
pub mod medium;
pub mod rule;
pub mod state_entry;
pub mod time_restriction;

pub use alert::{Alert, NotificationKind, SendOutcome};
pub use check::{Check, CheckId};
pub use condition::{Condition, Severity};
pub use contact::Contact;
pub use event::Event;
pub use maintenance::{MaintenanceKind, MaintenanceWindow};
pub use medium::{Medium, Transport};
pub use rule::Rule;
pub use state_entry::StateEntry;
pub use time_restriction::TimeRestriction;

use thiserror::Error;

/// Errors raised when validating entity payloads before mutation.
///
/// Nothing is applied to the store when validation fails.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The payload could not be deserialized into the entity shape.
    #[error("Malformed entity payload: {0}")]
    Malformed(String),

    /// A maintenance window whose end does not lie after its start.
    #[error("Maintenance window end time {end} must be after start time {start}")]
    WindowOrder {
        /// The rejected window's start time (Unix seconds).
        start: i64,
        /// The rejected window's end time (Unix seconds).
        end: i64,
    },

    /// A time restriction with an empty weekday set.
    #[error("Time restriction must name at least one weekday")]
    EmptyDays,

    /// A time restriction whose start offset is not within a single day.
    #[error("Time restriction start offset {0}s is past the end of the day")]
    OffsetOutOfRange(u32),

    /// A time restriction whose duration is zero or longer than a day.
    #[error("Time restriction duration {0}s must be between 1 second and one day")]
    DurationOutOfRange(u32),

    /// A throttled transport missing its delivery interval.
    #[error("Medium transport '{0}' requires a positive notification interval")]
    IntervalRequired(Transport),

    /// A transport that does not accept an interval carrying one.
    #[error("Medium transport '{0}' does not accept a notification interval")]
    IntervalForbidden(Transport),

    /// A medium with an empty delivery address.
    #[error("Medium transport '{0}' requires a non-empty address")]
    EmptyAddress(Transport),

    /// A contact timezone offset outside the representable range.
    #[error("Contact UTC offset {0}s is out of range")]
    UtcOffsetOutOfRange(i32),
}
