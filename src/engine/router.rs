//! The notification router: turns a state transition into resolved
//! delivery tuples on the per-transport queues.

use std::sync::Arc;
use thiserror::Error;

use crate::engine::history::{HistoryError, StateHistory};
use crate::engine::maintenance::{MaintenanceError, MaintenanceTracker};
use crate::engine::matcher;
use crate::models::{
    Alert, Check, Condition, MaintenanceKind, NotificationKind, SendOutcome, Severity, StateEntry,
    Transport,
};
use crate::notification::queue::ChannelQueues;
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::{ContactRepository, MaintenanceStore, StateStore};

/// Errors raised while routing a transition.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The delivery queue for a transport is closed; its worker is gone.
    #[error("Delivery queue for transport '{0}' is closed")]
    QueueClosed(Transport),

    /// State history access failed.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Maintenance window access failed.
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),

    /// The underlying store failed.
    #[error("Routing store error: {0}")]
    Store(#[from] PersistenceError),
}

/// Routes state transitions to contact media, honoring maintenance
/// suppression, per-medium interval throttling and rollup escalation.
pub struct NotificationRouter {
    contacts: Arc<dyn ContactRepository>,
    history: Arc<StateHistory<dyn StateStore>>,
    maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
    queues: ChannelQueues,
}

impl NotificationRouter {
    /// Creates a router emitting onto the given queues.
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        history: Arc<StateHistory<dyn StateStore>>,
        maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
        queues: ChannelQueues,
    ) -> Self {
        Self { contacts, history, maintenance, queues }
    }

    /// Routes one state transition. Returns the alerts that were enqueued;
    /// an empty list means the transition was suppressed or matched no
    /// media.
    pub async fn route_transition(
        &self,
        check: &Check,
        entry: &StateEntry,
        previous: Option<Condition>,
    ) -> Result<Vec<Alert>, RouteError> {
        if !check.enabled {
            tracing::debug!(check = %check.id, "Check disabled, not routing.");
            return Ok(Vec::new());
        }

        let Some(kind) = classify(entry.condition, previous) else {
            tracing::debug!(check = %check.id, condition = %entry.condition,
                "Transition produces no notification.");
            return Ok(Vec::new());
        };

        // problem/recovery alerting is suppressed while the check is in
        // maintenance; acknowledgements and tests still go out (the ack is
        // what opened the unscheduled window in the first place)
        if matches!(kind, NotificationKind::Problem | NotificationKind::Recovery)
            && self.in_any_maintenance(check, entry.timestamp).await?
        {
            tracing::info!(check = %check.id, kind = %kind,
                "Check in maintenance, suppressing notification.");
            return Ok(Vec::new());
        }

        let severity = self.severity_for(check, entry, kind).await?;
        tracing::debug!(check = %check.id, kind = %kind, severity = %severity,
            "Routing state transition.");

        let mut alerts = Vec::new();
        for contact in self.contacts.all_contacts().await? {
            let transports =
                matcher::resolve(&contact, &check.id.entity, &check.tags, severity, entry.timestamp);
            for transport in transports {
                let Some(medium) = contact.medium_for(transport) else {
                    continue;
                };

                if kind == NotificationKind::Problem
                    && self.throttled(&contact.id, medium, check, entry).await?
                {
                    tracing::debug!(contact = %contact.name, transport = %transport,
                        check = %check.id, "Repeat alert inside medium interval, dropping.");
                    continue;
                }

                let alerting_count = self
                    .update_alerting(&contact.id, transport, check, kind, entry.timestamp)
                    .await?;
                let rollup = medium
                    .rollup_threshold
                    .is_some_and(|threshold| alerting_count >= threshold as usize);

                let alert = Alert {
                    contact_id: contact.id,
                    contact_name: contact.name.clone(),
                    transport,
                    address: medium.address.clone(),
                    check: check.id.clone(),
                    condition: entry.condition,
                    severity,
                    kind,
                    rollup,
                    alerting_count,
                    summary: entry.summary.clone(),
                    details: entry.details.clone(),
                    time: entry.timestamp,
                };
                self.queues
                    .send(alert.clone())
                    .await
                    .map_err(|_| RouteError::QueueClosed(transport))?;
                alerts.push(alert);
            }
        }
        tracing::info!(check = %check.id, kind = %kind, count = alerts.len(),
            "Enqueued alerts for transition.");
        Ok(alerts)
    }

    /// Consumes a delivery outcome from a channel worker, updating the
    /// last-sent bookkeeping used for interval throttling. Failures are
    /// recorded in the log only; the core never retries.
    pub async fn record_outcome(&self, outcome: &SendOutcome) -> Result<(), RouteError> {
        if !outcome.success {
            tracing::warn!(contact = %outcome.contact_id, transport = %outcome.transport,
                check = %outcome.check, "Delivery failed; outcome not recorded.");
            return Ok(());
        }
        if outcome.kind == NotificationKind::Problem {
            self.contacts
                .record_send(
                    outcome.contact_id,
                    outcome.transport,
                    &outcome.check,
                    outcome.condition,
                    outcome.time,
                )
                .await?;
        }
        Ok(())
    }

    async fn in_any_maintenance(&self, check: &Check, t: i64) -> Result<bool, RouteError> {
        Ok(self.maintenance.in_window(&check.id, MaintenanceKind::Scheduled, t).await?
            || self.maintenance.in_window(&check.id, MaintenanceKind::Unscheduled, t).await?)
    }

    /// Problem severity comes from the condition itself; recovery and
    /// acknowledgement severity from the worst condition of the failure
    /// they resolve, so they reach the media that saw the problem.
    async fn severity_for(
        &self,
        check: &Check,
        entry: &StateEntry,
        kind: NotificationKind,
    ) -> Result<Severity, RouteError> {
        match kind {
            NotificationKind::Problem | NotificationKind::Test => {
                Ok(entry.condition.severity().unwrap_or(Severity::Critical))
            }
            NotificationKind::Recovery | NotificationKind::Acknowledgement => {
                Ok(self.max_severity_of_current_failure(check, entry.timestamp).await?)
            }
        }
    }

    async fn max_severity_of_current_failure(
        &self,
        check: &Check,
        t: i64,
    ) -> Result<Severity, RouteError> {
        let entries = self.history.query(&check.id, None, Some(t)).await?;
        let mut max = None;
        for entry in entries.iter().rev() {
            if entry.condition.is_pseudo() {
                continue;
            }
            if entry.condition.is_healthy() && max.is_some() {
                break;
            }
            if let Some(severity) = entry.condition.severity() {
                max = Some(max.map_or(severity, |m: Severity| m.max(severity)));
            }
        }
        Ok(max.unwrap_or(Severity::Critical))
    }

    async fn throttled(
        &self,
        contact: &uuid::Uuid,
        medium: &crate::models::Medium,
        check: &Check,
        entry: &StateEntry,
    ) -> Result<bool, RouteError> {
        let Some(interval) = medium.interval else {
            return Ok(false);
        };
        let last = self
            .contacts
            .last_send(*contact, medium.transport, &check.id, entry.condition)
            .await?;
        Ok(last.is_some_and(|last| entry.timestamp < last + i64::from(interval)))
    }

    /// Maintains the medium's alerting-check set and returns the count
    /// relevant to the rollup decision: after insertion for problems,
    /// before removal for recoveries.
    async fn update_alerting(
        &self,
        contact: &uuid::Uuid,
        transport: Transport,
        check: &Check,
        kind: NotificationKind,
        _t: i64,
    ) -> Result<usize, RouteError> {
        match kind {
            NotificationKind::Problem => {
                self.contacts.set_alerting(*contact, transport, &check.id).await?;
                Ok(self.contacts.alerting_checks(*contact, transport).await?.len())
            }
            NotificationKind::Recovery | NotificationKind::Acknowledgement => {
                let count = self.contacts.alerting_checks(*contact, transport).await?.len();
                if kind == NotificationKind::Recovery {
                    self.contacts.clear_alerting(*contact, transport, &check.id).await?;
                    self.contacts.clear_sends(*contact, transport, &check.id).await?;
                }
                Ok(count)
            }
            NotificationKind::Test => Ok(0),
        }
    }
}

/// Classifies a condition transition into a notification kind, or `None`
/// when no notification is due: a healthy report with no failing
/// predecessor is not a recovery.
pub fn classify(condition: Condition, previous: Option<Condition>) -> Option<NotificationKind> {
    match condition {
        Condition::Acknowledgement => Some(NotificationKind::Acknowledgement),
        Condition::Test => Some(NotificationKind::Test),
        Condition::Ok => match previous {
            Some(prev) if prev.is_failing() => Some(NotificationKind::Recovery),
            _ => None,
        },
        _ => Some(NotificationKind::Problem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckId, Contact, Medium};
    use crate::notification::queue::ChannelQueues;
    use crate::persistence::memory::MemoryStore;
    use crate::persistence::traits::{CheckRepository, StateStore as _};
    use std::collections::BTreeSet;

    struct Harness {
        store: Arc<MemoryStore>,
        router: NotificationRouter,
        receivers: std::collections::HashMap<Transport, tokio::sync::mpsc::Receiver<Alert>>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let history = Arc::new(StateHistory::new(store.clone() as Arc<dyn StateStore>));
        let maintenance =
            Arc::new(MaintenanceTracker::new(store.clone() as Arc<dyn MaintenanceStore>));
        let (queues, receivers) = ChannelQueues::new(16);
        let router = NotificationRouter::new(store.clone(), history, maintenance, queues);
        Harness { store, router, receivers }
    }

    fn check() -> Check {
        let mut tags = BTreeSet::new();
        tags.insert("web".to_string());
        Check::new(CheckId::new("web-01", "HTTP"), tags)
    }

    async fn seed_contact(store: &MemoryStore) -> Contact {
        let mut contact = Contact::new("Ada");
        contact.media.push(Medium::new(Transport::Email, "ada@example.com", Some(900)));
        store.upsert_contact(&contact).await.unwrap();
        contact
    }

    #[test]
    fn test_classify_transitions() {
        assert_eq!(
            classify(Condition::Critical, Some(Condition::Ok)),
            Some(NotificationKind::Problem)
        );
        assert_eq!(
            classify(Condition::Ok, Some(Condition::Critical)),
            Some(NotificationKind::Recovery)
        );
        // ok with no previous state is not a recovery
        assert_eq!(classify(Condition::Ok, None), None);
        assert_eq!(classify(Condition::Ok, Some(Condition::Ok)), None);
        assert_eq!(
            classify(Condition::Acknowledgement, Some(Condition::Critical)),
            Some(NotificationKind::Acknowledgement)
        );
        assert_eq!(classify(Condition::Test, None), Some(NotificationKind::Test));
    }

    #[tokio::test]
    async fn test_problem_routes_to_matching_media() {
        let mut harness = harness().await;
        seed_contact(&harness.store).await;
        let check = check();
        harness.store.upsert_check(&check).await.unwrap();

        let entry = StateEntry::new(Condition::Critical, 1000, "connection refused");
        let alerts = harness.router.route_transition(&check, &entry, None).await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].transport, Transport::Email);
        assert_eq!(alerts[0].kind, NotificationKind::Problem);
        assert_eq!(alerts[0].severity, Severity::Critical);

        let queued = harness
            .receivers
            .get_mut(&Transport::Email)
            .unwrap()
            .try_recv()
            .expect("alert should be on the email queue");
        assert_eq!(queued, alerts[0]);
    }

    #[tokio::test]
    async fn test_disabled_check_is_suppressed() {
        let harness = harness().await;
        seed_contact(&harness.store).await;
        let mut check = check();
        check.enabled = false;

        let entry = StateEntry::new(Condition::Critical, 1000, "down");
        let alerts = harness.router.route_transition(&check, &entry, None).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_maintenance_suppresses_problem_but_not_ack() {
        let harness = harness().await;
        seed_contact(&harness.store).await;
        let check = check();

        harness
            .store
            .add_window(
                &check.id,
                MaintenanceKind::Scheduled,
                &crate::models::MaintenanceWindow::new(500, 2000, "patching").unwrap(),
            )
            .await
            .unwrap();

        let problem = StateEntry::new(Condition::Critical, 1000, "down");
        let alerts = harness.router.route_transition(&check, &problem, None).await.unwrap();
        assert!(alerts.is_empty());

        let ack = StateEntry::new(Condition::Acknowledgement, 1100, "on it");
        let alerts = harness
            .router
            .route_transition(&check, &ack, Some(Condition::Critical))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, NotificationKind::Acknowledgement);
    }

    #[tokio::test]
    async fn test_interval_throttling_drops_repeat_problems() {
        let harness = harness().await;
        let contact = seed_contact(&harness.store).await;
        let check = check();

        let entry = StateEntry::new(Condition::Critical, 1000, "down");
        let alerts = harness.router.route_transition(&check, &entry, None).await.unwrap();
        assert_eq!(alerts.len(), 1);

        // the worker reports a successful send
        harness
            .router
            .record_outcome(&SendOutcome::for_alert(&alerts[0], 1000, true))
            .await
            .unwrap();

        // a repeat inside the 900s interval is dropped
        let repeat = StateEntry::new(Condition::Critical, 1500, "still down");
        let alerts = harness
            .router
            .route_transition(&check, &repeat, Some(Condition::Critical))
            .await
            .unwrap();
        assert!(alerts.is_empty());

        // after the interval elapses the alert goes out again
        let later = StateEntry::new(Condition::Critical, 1901, "still down");
        let alerts = harness
            .router
            .route_transition(&check, &later, Some(Condition::Critical))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);

        // a failed delivery is not recorded and does not throttle
        harness
            .router
            .record_outcome(&SendOutcome::for_alert(&alerts[0], 1901, false))
            .await
            .unwrap();
        assert_eq!(
            harness
                .store
                .last_send(contact.id, Transport::Email, &check.id, Condition::Critical)
                .await
                .unwrap(),
            Some(1000)
        );
    }

    #[tokio::test]
    async fn test_recovery_clears_throttle_and_uses_failure_severity() {
        let harness = harness().await;
        let contact = seed_contact(&harness.store).await;
        let check = check();

        // warning-severity failure recorded in history
        harness
            .store
            .append_entry(&check.id, &StateEntry::new(Condition::Ok, 100, "fine"))
            .await
            .unwrap();
        harness
            .store
            .append_entry(&check.id, &StateEntry::new(Condition::Warning, 500, "slow"))
            .await
            .unwrap();
        harness
            .store
            .record_send(contact.id, Transport::Email, &check.id, Condition::Warning, 500)
            .await
            .unwrap();

        let recovery = StateEntry::new(Condition::Ok, 1000, "fine again");
        let alerts = harness
            .router
            .route_transition(&check, &recovery, Some(Condition::Warning))
            .await
            .unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, NotificationKind::Recovery);
        assert_eq!(alerts[0].severity, Severity::Warning);

        // throttle state for the check was cleared on recovery
        assert!(harness
            .store
            .last_send(contact.id, Transport::Email, &check.id, Condition::Warning)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rollup_threshold_flips_alerts_to_rollup() {
        let harness = harness().await;
        let mut contact = Contact::new("Ops");
        let mut medium = Medium::new(Transport::Email, "ops@example.com", Some(60));
        medium.rollup_threshold = Some(2);
        contact.media.push(medium);
        harness.store.upsert_contact(&contact).await.unwrap();

        let first = check();
        let entry = StateEntry::new(Condition::Critical, 1000, "down");
        let alerts = harness.router.route_transition(&first, &entry, None).await.unwrap();
        assert!(!alerts[0].rollup);
        assert_eq!(alerts[0].alerting_count, 1);

        let second = Check::new(CheckId::new("web-02", "HTTP"), BTreeSet::new());
        let entry = StateEntry::new(Condition::Critical, 1100, "down");
        let alerts = harness.router.route_transition(&second, &entry, None).await.unwrap();
        assert!(alerts[0].rollup);
        assert_eq!(alerts[0].alerting_count, 2);
    }
}
