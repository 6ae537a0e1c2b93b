//! Ingestion: applies reported check results to the state history and
//! drives the notification router on every transition.

use std::sync::Arc;
use thiserror::Error;

use crate::engine::history::{HistoryError, StateHistory};
use crate::engine::maintenance::{MaintenanceError, MaintenanceTracker};
use crate::engine::router::{NotificationRouter, RouteError};
use crate::locks::{self, LockRegistry};
use crate::models::{Alert, Check, CheckId, Condition, Event, ValidationError};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::{CheckRepository, MaintenanceStore, StateStore};

/// Errors raised while ingesting an event.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The referenced check does not exist (acknowledgement or test of an
    /// unregistered check).
    #[error("No such check '{0}'")]
    NotFound(CheckId),

    /// A redundant action, e.g. acknowledging a check that is not
    /// failing. Reported, never fatal.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The event payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The event's timestamp is older than the check's last entry.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Maintenance bookkeeping failed.
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),

    /// Routing failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The underlying store failed.
    #[error("Ingestion store error: {0}")]
    Store(#[from] PersistenceError),
}

/// Ingestion settings.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Length of the unscheduled maintenance window opened by an
    /// acknowledgement, in seconds.
    pub ack_maintenance_secs: i64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        // acknowledgements silence a failure for four hours
        Self { ack_maintenance_secs: 4 * 3600 }
    }
}

/// Applies events to a check's history and flags, then routes the
/// resulting transition.
pub struct Processor {
    checks: Arc<dyn CheckRepository>,
    history: Arc<StateHistory<dyn StateStore>>,
    maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
    router: Arc<NotificationRouter>,
    locks: Arc<LockRegistry>,
    config: ProcessorConfig,
}

impl Processor {
    /// Creates a processor over the given services.
    pub fn new(
        checks: Arc<dyn CheckRepository>,
        history: Arc<StateHistory<dyn StateStore>>,
        maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
        router: Arc<NotificationRouter>,
        locks: Arc<LockRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        Self { checks, history, maintenance, router, locks, config }
    }

    /// Ingests one event, returning the alerts that were enqueued.
    #[tracing::instrument(skip(self, event), fields(check = %event.check, condition = %event.condition), level = "debug")]
    pub async fn process(&self, event: &Event) -> Result<Vec<Alert>, IngestError> {
        match event.condition {
            Condition::Acknowledgement => self.process_acknowledgement(event).await,
            Condition::Test => self.process_test(event).await,
            _ => self.process_service_event(event).await,
        }
    }

    /// A service event: create the check on first report, append to the
    /// history, refresh the derived flags and route the transition.
    async fn process_service_event(&self, event: &Event) -> Result<Vec<Alert>, IngestError> {
        let _guard = self.locks.acquire(&[locks::CHECK, locks::STATE]).await;

        let mut check = match self.checks.find_check(&event.check).await? {
            Some(check) => check,
            None => {
                tracing::info!(check = %event.check, "First report, registering check.");
                Check::new(event.check.clone(), event.tags.clone())
            }
        };
        check.tags.extend(event.tags.iter().cloned());

        let previous = self.history.latest(&check.id).await?.map(|e| e.condition);
        let entry = event.to_state_entry();
        self.history.append(&check.id, entry.clone()).await?;

        let was_failing = check.failing;
        check.failing = event.condition.is_failing();
        if check.failing && !was_failing {
            // a fresh failure gets a fresh acknowledgement token
            check.refresh_ack_hash();
        }
        self.checks.upsert_check(&check).await?;

        if previous.is_none() && event.condition.is_healthy() {
            // a brand-new check reporting ok is not a recovery
            tracing::debug!(check = %check.id, "Initial ok report, nothing to notify.");
            return Ok(Vec::new());
        }

        Ok(self.router.route_transition(&check, &entry, previous).await?)
    }

    /// An acknowledgement: opens an unscheduled maintenance window over
    /// the current failure and routes an acknowledgement notification.
    async fn process_acknowledgement(&self, event: &Event) -> Result<Vec<Alert>, IngestError> {
        let _guard = self
            .locks
            .acquire(&[locks::CHECK, locks::MAINTENANCE, locks::STATE])
            .await;

        let check = self
            .checks
            .find_check(&event.check)
            .await?
            .ok_or_else(|| IngestError::NotFound(event.check.clone()))?;

        if !check.failing {
            return Err(IngestError::Conflict(format!(
                "check '{}' is not failing, nothing to acknowledge",
                check.id
            )));
        }

        self.maintenance
            .set_unscheduled(
                &check.id,
                event.timestamp,
                event.timestamp + self.config.ack_maintenance_secs,
                &event.summary,
            )
            .await?;

        let previous = self.history.latest(&check.id).await?.map(|e| e.condition);
        let entry = event.to_state_entry();
        self.history.append(&check.id, entry.clone()).await?;

        Ok(self.router.route_transition(&check, &entry, previous).await?)
    }

    /// A test event: routes a test notification and touches nothing else.
    async fn process_test(&self, event: &Event) -> Result<Vec<Alert>, IngestError> {
        let check = self
            .checks
            .find_check(&event.check)
            .await?
            .ok_or_else(|| IngestError::NotFound(event.check.clone()))?;
        let entry = event.to_state_entry();
        Ok(self.router.route_transition(&check, &entry, None).await?)
    }
}
