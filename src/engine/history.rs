//! The authoritative, append-only state history of a check.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{CheckId, StateEntry};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::StateStore;

/// Errors raised by history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// An entry arrived with a timestamp earlier than the last recorded
    /// entry for the check. Entries must be applied in non-decreasing
    /// timestamp order.
    #[error("Entry for '{check}' at {got} is older than the last recorded entry at {last}")]
    StaleTimestamp {
        /// The check whose ordering was violated.
        check: CheckId,
        /// Timestamp of the last recorded entry.
        last: i64,
        /// Timestamp of the rejected entry.
        got: i64,
    },

    /// The underlying store failed.
    #[error("State store error: {0}")]
    Store(#[from] PersistenceError),
}

/// Append-only, per-check ordered log of state entries.
///
/// Writers for different checks are fully independent; the ordering check
/// here assumes the caller serializes writes per check (the processor does
/// so under its lock set).
pub struct StateHistory<S: StateStore + ?Sized> {
    store: Arc<S>,
}

impl<S: StateStore + ?Sized> StateHistory<S> {
    /// Creates a history service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Appends an entry, rejecting out-of-order timestamps. Entries with a
    /// timestamp equal to the latest are accepted; duplicate-condition
    /// coalescing is the report layer's concern.
    pub async fn append(&self, check: &CheckId, entry: StateEntry) -> Result<(), HistoryError> {
        if let Some(latest) = self.store.latest_entry(check).await? {
            if entry.timestamp < latest.timestamp {
                return Err(HistoryError::StaleTimestamp {
                    check: check.clone(),
                    last: latest.timestamp,
                    got: entry.timestamp,
                });
            }
        }
        self.store.append_entry(check, &entry).await?;
        Ok(())
    }

    /// Entries with `from <= timestamp <= to`, ascending. Either bound may
    /// be open.
    pub async fn query(
        &self,
        check: &CheckId,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<StateEntry>, HistoryError> {
        Ok(self.store.entries_in_range(check, from, to).await?)
    }

    /// The most recent entry, if any.
    pub async fn latest(&self, check: &CheckId) -> Result<Option<StateEntry>, HistoryError> {
        Ok(self.store.latest_entry(check).await?)
    }

    /// The last entry strictly before `t`, if any. The report engine uses
    /// this to establish the condition active at a window's left boundary.
    pub async fn entry_before(
        &self,
        check: &CheckId,
        t: i64,
    ) -> Result<Option<StateEntry>, HistoryError> {
        Ok(self.store.entry_before(check, t).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Condition;
    use crate::persistence::memory::MemoryStore;
    use crate::persistence::traits::MockStateStore;

    fn history() -> StateHistory<MemoryStore> {
        StateHistory::new(Arc::new(MemoryStore::new()))
    }

    fn check_id() -> CheckId {
        CheckId::new("web-01", "HTTP")
    }

    #[tokio::test]
    async fn test_append_rejects_older_timestamps() {
        let history = history();
        let id = check_id();

        history.append(&id, StateEntry::new(Condition::Ok, 200, "fine")).await.unwrap();

        let result = history.append(&id, StateEntry::new(Condition::Critical, 100, "late")).await;
        assert!(matches!(
            result,
            Err(HistoryError::StaleTimestamp { last: 200, got: 100, .. })
        ));

        // history unchanged by the rejected append
        assert_eq!(history.query(&id, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_accepts_equal_timestamps() {
        let history = history();
        let id = check_id();

        history.append(&id, StateEntry::new(Condition::Critical, 100, "down")).await.unwrap();
        history.append(&id, StateEntry::new(Condition::Critical, 100, "still down")).await.unwrap();

        assert_eq!(history.query(&id, None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_and_skips_the_append() {
        let mut store = MockStateStore::new();
        store
            .expect_latest_entry()
            .times(1)
            .returning(|_| Err(PersistenceError::Unavailable("store down".to_string())));
        store.expect_append_entry().times(0);

        let history = StateHistory::new(Arc::new(store));
        let result = history.append(&check_id(), StateEntry::new(Condition::Ok, 100, "fine")).await;
        assert!(matches!(result, Err(HistoryError::Store(PersistenceError::Unavailable(_)))));
    }

    #[tokio::test]
    async fn test_independent_checks_do_not_interfere() {
        let history = history();
        let first = CheckId::new("web-01", "HTTP");
        let second = CheckId::new("web-02", "HTTP");

        history.append(&first, StateEntry::new(Condition::Ok, 500, "fine")).await.unwrap();
        // an older timestamp on a different check is not stale
        history.append(&second, StateEntry::new(Condition::Ok, 100, "fine")).await.unwrap();

        assert_eq!(history.latest(&first).await.unwrap().unwrap().timestamp, 500);
        assert_eq!(history.latest(&second).await.unwrap().unwrap().timestamp, 100);
    }
}
