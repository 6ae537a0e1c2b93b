//! The Vigil engine: state history, maintenance tracking, outage/downtime
//! reporting, rule matching and notification routing.

pub mod history;
pub mod maintenance;
pub mod matcher;
pub mod processor;
pub mod report;
pub mod router;
