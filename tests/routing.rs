//! End-to-end routing tests: events in, alerts on the per-transport
//! queues out, with rule matching, suppression and throttling applied.

use std::sync::Arc;
use vigil::{
    engine::{
        history::StateHistory,
        maintenance::MaintenanceTracker,
        processor::{IngestError, Processor, ProcessorConfig},
        router::NotificationRouter,
    },
    locks::LockRegistry,
    models::{CheckId, Condition, MaintenanceKind, Medium, NotificationKind, Severity, Transport},
    notification::queue::ChannelQueues,
    persistence::{
        memory::MemoryStore,
        traits::{ContactRepository, MaintenanceStore, StateStore},
    },
    test_helpers::{ContactBuilder, EventBuilder, RuleBuilder},
};

struct Fixture {
    store: Arc<MemoryStore>,
    maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
    processor: Processor,
    // keeps the delivery queues open for the router's sends
    _receivers: std::collections::HashMap<Transport, tokio::sync::mpsc::Receiver<vigil::models::Alert>>,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let history = Arc::new(StateHistory::new(store.clone() as Arc<dyn StateStore>));
    let maintenance =
        Arc::new(MaintenanceTracker::new(store.clone() as Arc<dyn MaintenanceStore>));
    let (queues, receivers) = ChannelQueues::new(64);
    let router = Arc::new(NotificationRouter::new(
        store.clone(),
        history.clone(),
        maintenance.clone(),
        queues,
    ));
    let processor = Processor::new(
        store.clone(),
        history,
        maintenance.clone(),
        router,
        Arc::new(LockRegistry::new()),
        ProcessorConfig::default(),
    );
    Fixture { store, maintenance, processor, _receivers: receivers }
}

#[tokio::test]
async fn test_rule_scoped_routing_across_contacts() {
    let fixture = fixture().await;

    // Ada hears about everything by email; Grace only about database
    // checks, by SMS
    let ada = ContactBuilder::new().name("Ada").email("ada@example.com").build();
    let grace = ContactBuilder::new()
        .name("Grace")
        .sms("+15550000000")
        .rule(RuleBuilder::new().tag("database").medium(Transport::Sms).build())
        .build();
    fixture.store.upsert_contact(&ada).await.unwrap();
    fixture.store.upsert_contact(&grace).await.unwrap();

    // a web check reaches both: Grace's specific rule does not match, so
    // her synthesized general fallback default-notifies
    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1000).tag("web").build())
        .await
        .unwrap();
    let mut recipients: Vec<(String, Transport)> = alerts
        .iter()
        .map(|a| (a.contact_name.clone(), a.transport))
        .collect();
    recipients.sort();
    assert_eq!(
        recipients,
        vec![
            ("Ada".to_string(), Transport::Email),
            ("Grace".to_string(), Transport::Sms)
        ]
    );

    // a database check reaches both: Ada through her default-notify
    // fallback, Grace through the specific rule
    let alerts = fixture
        .processor
        .process(
            &EventBuilder::new(Condition::Critical, 2000)
                .check(CheckId::new("db-01", "MYSQL"))
                .tag("database")
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(alerts.len(), 2);
}

#[tokio::test]
async fn test_blackhole_rule_silences_one_severity() {
    let fixture = fixture().await;

    let contact = ContactBuilder::new()
        .name("Ada")
        .email("ada@example.com")
        .rule(
            RuleBuilder::new()
                .medium(Transport::Email)
                .warning_blackhole()
                .build(),
        )
        .build();
    fixture.store.upsert_contact(&contact).await.unwrap();

    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Warning, 1000).build())
        .await
        .unwrap();
    assert!(alerts.is_empty(), "warning severity is blackholed");

    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 2000).build())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

#[tokio::test]
async fn test_maintenance_suppresses_alerting_but_not_reports() {
    let fixture = fixture().await;
    let contact = ContactBuilder::new().name("Ada").email("ada@example.com").build();
    fixture.store.upsert_contact(&contact).await.unwrap();

    let check = CheckId::new("web-01", "HTTP");
    // register the check with a first healthy report
    fixture
        .processor
        .process(&EventBuilder::new(Condition::Ok, 500).build())
        .await
        .unwrap();

    fixture.maintenance.add_scheduled(&check, 900, 2000, "deploy").await.unwrap();

    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1000).build())
        .await
        .unwrap();
    assert!(alerts.is_empty(), "problem inside maintenance is suppressed");

    // the state entry still landed in history
    let entries = fixture.store.entries_in_range(&check, None, None).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_acknowledgement_flow_end_to_end() {
    let fixture = fixture().await;
    let contact = ContactBuilder::new().name("Ada").email("ada@example.com").build();
    fixture.store.upsert_contact(&contact).await.unwrap();

    let check = CheckId::new("web-01", "HTTP");
    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1000).build())
        .await
        .unwrap();
    assert_eq!(alerts[0].kind, NotificationKind::Problem);

    // the acknowledgement notifies and opens unscheduled maintenance
    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Acknowledgement, 1100).summary("on it").build())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, NotificationKind::Acknowledgement);

    let open = fixture
        .store
        .open_windows_at(&check, MaintenanceKind::Unscheduled, 1200)
        .await
        .unwrap();
    assert_eq!(open.len(), 1);

    // further problem reports are silenced by the window
    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1300).build())
        .await
        .unwrap();
    assert!(alerts.is_empty());

    // acknowledging twice conflicts with nothing failing... the check is
    // still failing, so a second ack simply truncates and reopens
    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Acknowledgement, 1400).build())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
async fn test_ack_of_healthy_check_is_a_conflict() {
    let fixture = fixture().await;
    let contact = ContactBuilder::new().name("Ada").email("ada@example.com").build();
    fixture.store.upsert_contact(&contact).await.unwrap();

    fixture
        .processor
        .process(&EventBuilder::new(Condition::Ok, 1000).build())
        .await
        .unwrap();

    let result = fixture
        .processor
        .process(&EventBuilder::new(Condition::Acknowledgement, 1100).build())
        .await;
    assert!(matches!(result, Err(IngestError::Conflict(_))));
}

#[tokio::test]
async fn test_repeat_problem_throttled_by_medium_interval() {
    let fixture = fixture().await;
    let contact = ContactBuilder::new()
        .name("Ada")
        .medium(Medium::new(Transport::Email, "ada@example.com", Some(600)))
        .build();
    fixture.store.upsert_contact(&contact).await.unwrap();

    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1000).build())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);

    // simulate the worker recording the successful send
    fixture
        .store
        .record_send(contact.id, Transport::Email, &CheckId::new("web-01", "HTTP"), Condition::Critical, 1000)
        .await
        .unwrap();

    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1300).build())
        .await
        .unwrap();
    assert!(alerts.is_empty(), "inside the 600s interval");

    let alerts = fixture
        .processor
        .process(&EventBuilder::new(Condition::Critical, 1700).build())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1, "interval elapsed");
}
