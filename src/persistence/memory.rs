//! An embedded, ordered-map implementation of the repository traits.
//!
//! Backs unit tests and embeddings that do not want a database file; the
//! SQLite implementation is the durable twin behind the same traits.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Check, CheckId, Condition, Contact, MaintenanceKind, MaintenanceWindow, StateEntry, Transport,
};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::{
    CheckRepository, ContactRepository, MaintenanceStore, StateStore,
};

type SendKey = (Uuid, Transport, CheckId, Condition);

#[derive(Default)]
struct Inner {
    checks: BTreeMap<String, Check>,
    histories: BTreeMap<String, Vec<StateEntry>>,
    windows: HashMap<(String, MaintenanceKind), Vec<MaintenanceWindow>>,
    contacts: BTreeMap<Uuid, Contact>,
    sends: HashMap<SendKey, i64>,
    alerting: HashMap<(Uuid, Transport), BTreeSet<CheckId>>,
}

/// In-memory store; all collections live behind one async `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckRepository for MemoryStore {
    async fn upsert_check(&self, check: &Check) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        inner.checks.insert(check.id.to_string(), check.clone());
        Ok(())
    }

    async fn find_check(&self, id: &CheckId) -> Result<Option<Check>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.checks.get(&id.to_string()).cloned())
    }

    async fn checks_by_tag(&self, tag: &str) -> Result<Vec<Check>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.checks.values().filter(|c| c.tags.contains(tag)).cloned().collect())
    }

    async fn all_checks(&self) -> Result<Vec<Check>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.checks.values().cloned().collect())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn append_entry(
        &self,
        check: &CheckId,
        entry: &StateEntry,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        inner.histories.entry(check.to_string()).or_default().push(entry.clone());
        Ok(())
    }

    async fn entries_in_range(
        &self,
        check: &CheckId,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<StateEntry>, PersistenceError> {
        let inner = self.inner.read().await;
        let entries = inner
            .histories
            .get(&check.to_string())
            .map(|history| {
                history
                    .iter()
                    .filter(|e| {
                        from.map_or(true, |from| e.timestamp >= from)
                            && to.map_or(true, |to| e.timestamp <= to)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }

    async fn latest_entry(
        &self,
        check: &CheckId,
    ) -> Result<Option<StateEntry>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.histories.get(&check.to_string()).and_then(|h| h.last().cloned()))
    }

    async fn entry_before(
        &self,
        check: &CheckId,
        t: i64,
    ) -> Result<Option<StateEntry>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .histories
            .get(&check.to_string())
            .and_then(|h| h.iter().rev().find(|e| e.timestamp < t).cloned()))
    }
}

#[async_trait]
impl MaintenanceStore for MemoryStore {
    async fn add_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        window: &MaintenanceWindow,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        let windows = inner.windows.entry((check.to_string(), kind)).or_default();
        windows.push(window.clone());
        windows.sort_by_key(|w| w.start_time);
        Ok(())
    }

    async fn find_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
    ) -> Result<Option<MaintenanceWindow>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .windows
            .get(&(check.to_string(), kind))
            .and_then(|ws| ws.iter().find(|w| w.id == id).cloned()))
    }

    async fn update_window_end(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
        end_time: i64,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        let window = inner
            .windows
            .get_mut(&(check.to_string(), kind))
            .and_then(|ws| ws.iter_mut().find(|w| w.id == id))
            .ok_or_else(|| PersistenceError::NotFound(format!("{kind} maintenance {id}")))?;
        window.end_time = end_time;
        Ok(())
    }

    async fn delete_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        if let Some(windows) = inner.windows.get_mut(&(check.to_string(), kind)) {
            windows.retain(|w| w.id != id);
        }
        Ok(())
    }

    async fn windows_intersecting(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<MaintenanceWindow>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .windows
            .get(&(check.to_string(), kind))
            .map(|ws| ws.iter().filter(|w| w.intersects(from, to)).cloned().collect())
            .unwrap_or_default())
    }

    async fn open_windows_at(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        t: i64,
    ) -> Result<Vec<MaintenanceWindow>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .windows
            .get(&(check.to_string(), kind))
            .map(|ws| ws.iter().filter(|w| w.covers(t)).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn upsert_contact(&self, contact: &Contact) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        inner.contacts.insert(contact.id, contact.clone());
        Ok(())
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.contacts.get(&id).cloned())
    }

    async fn all_contacts(&self) -> Result<Vec<Contact>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.contacts.values().cloned().collect())
    }

    async fn record_send(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
        condition: Condition,
        time: i64,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        inner.sends.insert((contact, transport, check.clone(), condition), time);
        Ok(())
    }

    async fn last_send(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
        condition: Condition,
    ) -> Result<Option<i64>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.sends.get(&(contact, transport, check.clone(), condition)).copied())
    }

    async fn clear_sends(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        inner
            .sends
            .retain(|(c, tr, ch, _), _| !(*c == contact && *tr == transport && ch == check));
        Ok(())
    }

    async fn set_alerting(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        inner.alerting.entry((contact, transport)).or_default().insert(check.clone());
        Ok(())
    }

    async fn clear_alerting(
        &self,
        contact: Uuid,
        transport: Transport,
        check: &CheckId,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        if let Some(alerting) = inner.alerting.get_mut(&(contact, transport)) {
            alerting.remove(check);
        }
        Ok(())
    }

    async fn alerting_checks(
        &self,
        contact: Uuid,
        transport: Transport,
    ) -> Result<Vec<CheckId>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .alerting
            .get(&(contact, transport))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
