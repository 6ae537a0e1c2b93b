//! One-off outage/downtime queries against the store, printed as JSON.

use clap::Args;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::engine::history::StateHistory;
use crate::engine::maintenance::MaintenanceTracker;
use crate::engine::report::{ReportEngine, ReportError};
use crate::models::CheckId;
use crate::persistence::error::PersistenceError;
use crate::persistence::sqlite::SqliteStore;
use crate::persistence::traits::{MaintenanceStore, StateStore};

/// Arguments for the `report` subcommand.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Check to report on, as 'entity:name'. Mutually exclusive with
    /// --tag.
    #[arg(long, conflicts_with = "tag")]
    pub check: Option<CheckId>,

    /// Tag to report on: one report per check carrying the tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Range start, Unix seconds. Open when omitted.
    #[arg(long)]
    pub from: Option<i64>,

    /// Range end, Unix seconds. Open when omitted.
    #[arg(long)]
    pub to: Option<i64>,

    /// Compute downtime statistics instead of plain outages.
    #[arg(long)]
    pub downtime: bool,

    /// Database URL; defaults to the configured one.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Errors raised by the `report` subcommand.
#[derive(Debug, Error)]
pub enum ReportCmdError {
    /// Neither --check nor --tag was given.
    #[error("One of --check or --tag is required")]
    MissingSubject,

    /// The store could not be opened.
    #[error(transparent)]
    Store(#[from] PersistenceError),

    /// The report query failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The report could not be serialized for output.
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Executes the report query and prints the result to stdout as JSON.
pub async fn execute(args: ReportArgs, config: &AppConfig) -> Result<(), ReportCmdError> {
    let database_url = args.database_url.as_deref().unwrap_or(&config.database_url);
    let store = Arc::new(SqliteStore::new(database_url).await?);
    store.run_migrations().await?;

    let history = Arc::new(StateHistory::new(store.clone() as Arc<dyn StateStore>));
    let maintenance =
        Arc::new(MaintenanceTracker::new(store.clone() as Arc<dyn MaintenanceStore>));
    let engine = ReportEngine::new(store, history, maintenance);

    let output = match (&args.check, &args.tag) {
        (Some(check), _) => {
            if args.downtime {
                serde_json::to_string_pretty(
                    &engine.downtime(check, args.from, args.to).await?,
                )?
            } else {
                serde_json::to_string_pretty(&engine.outages(check, args.from, args.to).await?)?
            }
        }
        (None, Some(tag)) => {
            if args.downtime {
                serde_json::to_string_pretty(
                    &engine.downtime_for_tag(tag, args.from, args.to).await?,
                )?
            } else {
                serde_json::to_string_pretty(
                    &engine.outages_for_tag(tag, args.from, args.to).await?,
                )?
            }
        }
        (None, None) => return Err(ReportCmdError::MissingSubject),
    };

    println!("{output}");
    Ok(())
}
