//! Integration tests for the persistence layer: the SQLite store must
//! behave identically to the in-memory store behind the same traits.

use std::collections::BTreeSet;
use vigil::{
    models::{Check, CheckId, Condition, MaintenanceKind, MaintenanceWindow, StateEntry, Transport},
    persistence::{
        memory::MemoryStore,
        sqlite::SqliteStore,
        traits::{CheckRepository, ContactRepository, MaintenanceStore, StateStore},
    },
    test_helpers::ContactBuilder,
};

async fn setup_db() -> SqliteStore {
    let store = SqliteStore::new("sqlite::memory:")
        .await
        .expect("Failed to set up in-memory database");
    store.run_migrations().await.expect("Failed to run migrations");
    store
}

fn check_id() -> CheckId {
    CheckId::new("web-01", "HTTP")
}

#[tokio::test]
async fn test_check_lifecycle() {
    let store = setup_db().await;

    // 1. Initially, the check does not exist
    assert!(store.find_check(&check_id()).await.unwrap().is_none());

    // 2. Upsert and read back
    let mut tags = BTreeSet::new();
    tags.insert("web".to_string());
    tags.insert("production".to_string());
    let mut check = Check::new(check_id(), tags);
    store.upsert_check(&check).await.unwrap();

    let stored = store.find_check(&check_id()).await.unwrap().unwrap();
    assert_eq!(stored, check);

    // 3. Flag updates replace the stored row
    check.failing = true;
    check.refresh_ack_hash();
    store.upsert_check(&check).await.unwrap();
    let stored = store.find_check(&check_id()).await.unwrap().unwrap();
    assert!(stored.failing);
    assert_eq!(stored.ack_hash, check.ack_hash);

    // 4. Tag lookup
    let tagged = store.checks_by_tag("production").await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert!(store.checks_by_tag("absent").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_history_ordering_and_boundaries() {
    let store = setup_db().await;
    let id = check_id();

    for (condition, ts) in
        [(Condition::Ok, 100), (Condition::Critical, 200), (Condition::Ok, 300)]
    {
        store.append_entry(&id, &StateEntry::new(condition, ts, "state")).await.unwrap();
    }

    // ascending order, inclusive bounds
    let entries = store.entries_in_range(&id, Some(100), Some(200)).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].timestamp, 100);
    assert_eq!(entries[1].timestamp, 200);

    let latest = store.latest_entry(&id).await.unwrap().unwrap();
    assert_eq!(latest.timestamp, 300);

    // strictly-before lookup
    let before = store.entry_before(&id, 300).await.unwrap().unwrap();
    assert_eq!(before.timestamp, 200);
    assert!(store.entry_before(&id, 100).await.unwrap().is_none());

    // an unknown check has no history
    let other = CheckId::new("web-02", "HTTP");
    assert!(store.entries_in_range(&other, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_maintenance_window_lifecycle() {
    let store = setup_db().await;
    let id = check_id();

    let window = MaintenanceWindow::new(100, 200, "patching").unwrap();
    store.add_window(&id, MaintenanceKind::Scheduled, &window).await.unwrap();

    // 1. Lookup honors the collection kind
    let found = store.find_window(&id, MaintenanceKind::Scheduled, window.id).await.unwrap();
    assert_eq!(found.as_ref().map(|w| w.id), Some(window.id));
    assert!(store
        .find_window(&id, MaintenanceKind::Unscheduled, window.id)
        .await
        .unwrap()
        .is_none());

    // 2. Shorten the end time
    store.update_window_end(&id, MaintenanceKind::Scheduled, window.id, 150).await.unwrap();
    let updated =
        store.find_window(&id, MaintenanceKind::Scheduled, window.id).await.unwrap().unwrap();
    assert_eq!(updated.end_time, 150);

    // 3. Intersection is strict: touching does not overlap
    let hits = store
        .windows_intersecting(&id, MaintenanceKind::Scheduled, Some(150), Some(400))
        .await
        .unwrap();
    assert!(hits.is_empty());
    let hits = store
        .windows_intersecting(&id, MaintenanceKind::Scheduled, Some(149), Some(400))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    // 4. Delete removes it
    store.delete_window(&id, MaintenanceKind::Scheduled, window.id).await.unwrap();
    assert!(store
        .find_window(&id, MaintenanceKind::Scheduled, window.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_contact_payload_round_trip() {
    let store = setup_db().await;

    let contact = ContactBuilder::new()
        .name("Ada")
        .utc_offset_secs(10 * 3600)
        .email("ada@example.com")
        .sms("+61400000000")
        .build();
    store.upsert_contact(&contact).await.unwrap();

    let found = store.find_contact(contact.id).await.unwrap().unwrap();
    assert_eq!(found, contact);
    assert_eq!(store.all_contacts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_and_alerting_bookkeeping() {
    let store = setup_db().await;
    let id = check_id();
    let contact = uuid::Uuid::new_v4();

    store.record_send(contact, Transport::Email, &id, Condition::Critical, 1000).await.unwrap();
    assert_eq!(
        store.last_send(contact, Transport::Email, &id, Condition::Critical).await.unwrap(),
        Some(1000)
    );
    // re-recording replaces the timestamp
    store.record_send(contact, Transport::Email, &id, Condition::Critical, 2000).await.unwrap();
    assert_eq!(
        store.last_send(contact, Transport::Email, &id, Condition::Critical).await.unwrap(),
        Some(2000)
    );

    store.clear_sends(contact, Transport::Email, &id).await.unwrap();
    assert!(store
        .last_send(contact, Transport::Email, &id, Condition::Critical)
        .await
        .unwrap()
        .is_none());

    store.set_alerting(contact, Transport::Email, &id).await.unwrap();
    store.set_alerting(contact, Transport::Email, &id).await.unwrap();
    assert_eq!(store.alerting_checks(contact, Transport::Email).await.unwrap(), vec![id.clone()]);
    store.clear_alerting(contact, Transport::Email, &id).await.unwrap();
    assert!(store.alerting_checks(contact, Transport::Email).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_and_sqlite_stores_agree() {
    let sqlite = setup_db().await;
    let memory = MemoryStore::new();
    let id = check_id();

    for store in [&sqlite as &dyn StateStore, &memory as &dyn StateStore] {
        for (condition, ts) in [(Condition::Critical, 100), (Condition::Ok, 250)] {
            store.append_entry(&id, &StateEntry::new(condition, ts, "state")).await.unwrap();
        }
    }

    let from_sqlite = sqlite.entries_in_range(&id, Some(50), Some(300)).await.unwrap();
    let from_memory = memory.entries_in_range(&id, Some(50), Some(300)).await.unwrap();
    assert_eq!(from_sqlite, from_memory);

    assert_eq!(
        sqlite.entry_before(&id, 250).await.unwrap(),
        memory.entry_before(&id, 250).await.unwrap()
    );
}

#[tokio::test]
async fn test_store_survives_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/vigil-test.db", dir.path().display());

    {
        let store = SqliteStore::new(&url).await.unwrap();
        store.run_migrations().await.unwrap();
        store
            .append_entry(&check_id(), &StateEntry::new(Condition::Critical, 100, "down"))
            .await
            .unwrap();
    }

    let reopened = SqliteStore::new(&url).await.unwrap();
    reopened.run_migrations().await.unwrap();
    let entries = reopened.entries_in_range(&check_id(), None, None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].condition, Condition::Critical);
}
