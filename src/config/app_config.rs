use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::deserialize_duration_from_seconds;

/// Provides the default value for shutdown_timeout_secs.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Provides the default value for channel_capacity.
fn default_channel_capacity() -> usize {
    1024
}

/// Provides the default value for ack_maintenance_secs.
fn default_ack_maintenance_secs() -> i64 {
    4 * 3600
}

/// Provides the default value for database_url.
fn default_database_url() -> String {
    "sqlite://vigil.db".to_string()
}

/// Application configuration for Vigil.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Path to the contact seed file loaded at startup, if any.
    #[serde(default)]
    pub contacts_path: Option<PathBuf>,

    /// Path to the check seed file loaded at startup, if any.
    #[serde(default)]
    pub checks_path: Option<PathBuf>,

    /// The capacity of each per-transport delivery queue.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Length of the unscheduled maintenance window opened by an
    /// acknowledgement, in seconds.
    #[serde(default = "default_ack_maintenance_secs")]
    pub ack_maintenance_secs: i64,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            contacts_path: None,
            checks_path: None,
            channel_capacity: default_channel_capacity(),
            ack_maintenance_secs: default_ack_maintenance_secs(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from an optional TOML file layered under
    /// `VIGIL_`-prefixed environment variables.
    pub fn new(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        } else {
            builder = builder.add_source(File::with_name("vigil").required(false));
        }
        builder
            .add_source(Environment::with_prefix("VIGIL"))
            .build()?
            .try_deserialize()
    }
}
