//! Repository traits the core is written against. Implementations exist
//! for an embedded ordered map (`memory`) and SQLite (`sqlite`); anything
//! providing ordered range queries can stand behind them.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::models::{
    Check, CheckId, Condition, Contact, MaintenanceKind, MaintenanceWindow, StateEntry, Transport,
};
use crate::persistence::error::PersistenceError;

/// Repository of check identities and their derived flags.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CheckRepository: Send + Sync {
    /// Inserts or replaces a check.
    async fn upsert_check(&self, check: &Check) -> Result<(), PersistenceError>;

    /// Retrieves a check by id.
    async fn find_check(&self, id: &CheckId) -> Result<Option<Check>, PersistenceError>;

    /// All checks carrying the given tag.
    async fn checks_by_tag(&self, tag: &str) -> Result<Vec<Check>, PersistenceError>;

    /// Every registered check.
    async fn all_checks(&self) -> Result<Vec<Check>, PersistenceError>;
}

/// Append-only, per-check ordered log of state entries.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Appends an entry to a check's history. Ordering enforcement lives
    /// in the history service, not here.
    async fn append_entry(
        &self,
        check: &CheckId,
        entry: &StateEntry,
    ) -> Result<(), PersistenceError>;

    /// Entries with `from <= timestamp <= to` in ascending order; either
    /// bound may be open.
    async fn entries_in_range(
        &self,
        check: &CheckId,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<StateEntry>, PersistenceError>;

    /// The most recent entry for a check, if any.
    async fn latest_entry(&self, check: &CheckId)
        -> Result<Option<StateEntry>, PersistenceError>;

    /// The last entry strictly before `t`, if any.
    async fn entry_before(
        &self,
        check: &CheckId,
        t: i64,
    ) -> Result<Option<StateEntry>, PersistenceError>;
}

/// Per-check storage of the two maintenance-window collections.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Inserts a window into the given collection.
    async fn add_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        window: &MaintenanceWindow,
    ) -> Result<(), PersistenceError>;

    /// Retrieves a window by id.
    async fn find_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
    ) -> Result<Option<MaintenanceWindow>, PersistenceError>;

    /// Rewrites a window's end time. The window is never extended by the
    /// callers of this method.
    async fn update_window_end(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
        end_time: i64,
    ) -> Result<(), PersistenceError>;

    /// Removes a window.
    async fn delete_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
    ) -> Result<(), PersistenceError>;

    /// Windows strictly overlapping `[from, to)`, ordered by start time.
    /// Touching a boundary does not count as overlapping.
    async fn windows_intersecting(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<MaintenanceWindow>, PersistenceError>;

    /// Windows covering the instant `t` (`start <= t < end`).
    async fn open_windows_at(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        t: i64,
    ) -> Result<Vec<MaintenanceWindow>, PersistenceError>;
}

/// Repository of contacts plus the delivery bookkeeping the router keeps
/// per (contact, transport): last successful sends and the set of
/// currently alerting checks used for rollup escalation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Inserts or replaces a contact with its rules and media.
    async fn upsert_contact(&self, contact: &Contact) -> Result<(), PersistenceError>;

    /// Retrieves a contact by id.
    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, PersistenceError>;

    /// Every registered contact.
    async fn all_contacts(&self) -> Result<Vec<Contact>, PersistenceError>;

    /// Records a successful problem send, keyed by contact, transport,
    /// check and condition.
    async fn record_send(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
        condition: Condition,
        time: i64,
    ) -> Result<(), PersistenceError>;

    /// The time of the last recorded send for the key, if any.
    async fn last_send(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
        condition: Condition,
    ) -> Result<Option<i64>, PersistenceError>;

    /// Clears every recorded send for the (contact, transport, check)
    /// triple; called on recovery so the next problem alerts immediately.
    async fn clear_sends(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError>;

    /// Marks a check as alerting on a medium.
    async fn set_alerting(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError>;

    /// Removes a check from a medium's alerting set.
    async fn clear_alerting(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError>;

    /// The checks currently alerting on a medium.
    async fn alerting_checks(
        &self,
        contact: Uuid,
        transport: Transport,
    ) -> Result<Vec<CheckId>, PersistenceError>;
}

/// Convenience supertrait for stores implementing every repository.
pub trait Store: CheckRepository + StateStore + MaintenanceStore + ContactRepository {}

impl<T: CheckRepository + StateStore + MaintenanceStore + ContactRepository> Store for T {}
