#![warn(missing_docs)]
//! Vigil is the monitoring and alerting core of a check-and-notify
//! platform: it tracks per-check state history, manages maintenance
//! windows, derives outage and downtime reports, and routes state
//! transitions to contact media through per-channel delivery queues.

pub mod cmd;
pub mod config;
pub mod engine;
pub mod loader;
pub mod locks;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod registry;
pub mod supervisor;
pub mod test_helpers;
