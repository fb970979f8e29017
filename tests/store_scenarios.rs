//! End-to-end mute scenarios against the public store API.

use alert_mute::infrastructure::mocks::{MemoryGateway, MockClock};
use alert_mute::{SnapshotEntry, SourceType, SuppressionEvent, SuppressionKey, SuppressionStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

fn t() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 4, 8, 30, 0).unwrap()
}

fn cpu_load() -> SuppressionKey {
    SuppressionKey::new(SourceType::Int, "load", "Percent")
}

struct Harness {
    clock: MockClock,
    store: SuppressionStore,
    events: Arc<Mutex<Vec<SuppressionEvent>>>,
    _subscription: alert_mute::Subscription,
}

impl Harness {
    fn new() -> Self {
        let clock = MockClock::new(t());
        let store = SuppressionStore::new(Arc::new(clock.clone()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let subscription = store.subscribe(move |e| events_clone.lock().unwrap().push(e.clone()));

        Self {
            clock,
            store,
            events,
            _subscription: subscription,
        }
    }

    fn events(&self) -> Vec<SuppressionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[test]
fn test_mute_lifts_on_sweep_after_expiry() {
    let h = Harness::new();

    h.store.suppress(cpu_load(), "cpu", t() + Duration::minutes(5));

    h.clock.set(t() + Duration::minutes(1));
    assert!(h.store.is_suppressed(&cpu_load(), "cpu"));

    h.clock.set(t() + Duration::minutes(6));
    assert!(h.store.is_suppressed(&cpu_load(), "cpu"), "expiry is lazy until a sweep");

    assert_eq!(h.store.sweep(t() + Duration::minutes(6)), 1);
    assert!(!h.store.is_suppressed(&cpu_load(), "cpu"));

    assert_eq!(
        h.events(),
        vec![
            SuppressionEvent::Suppressed {
                key: cpu_load(),
                channel: "cpu".to_string(),
                expires_at: t() + Duration::minutes(5),
            },
            SuppressionEvent::Unsuppressed {
                key: cpu_load(),
                channel: "cpu".to_string(),
            },
        ]
    );
}

#[test]
fn test_restored_expired_entry_is_unsuppressed_without_prior_suppressed() {
    let h = Harness::new();
    let gateway = MemoryGateway::with_entries(vec![SnapshotEntry::new(
        "cpu",
        cpu_load(),
        t() - Duration::minutes(1),
    )]);

    h.store.restore(&gateway).unwrap();

    assert!(h.store.is_empty());
    assert_eq!(
        h.events(),
        vec![SuppressionEvent::Unsuppressed {
            key: cpu_load(),
            channel: "cpu".to_string(),
        }]
    );
}

#[test]
fn test_resuppress_extends_without_event() {
    let h = Harness::new();

    h.store.suppress(cpu_load(), "cpu", t() + Duration::minutes(5));
    h.store.suppress(cpu_load(), "cpu", t() + Duration::hours(1));

    assert_eq!(h.events().len(), 1);

    h.store.sweep(t() + Duration::minutes(10));
    assert!(h.store.is_suppressed(&cpu_load(), "cpu"));

    h.store.sweep(t() + Duration::hours(1));
    assert!(!h.store.is_suppressed(&cpu_load(), "cpu"));
    assert_eq!(h.events().len(), 2);
}

#[test]
fn test_resuppress_can_shorten_expiry() {
    let h = Harness::new();

    h.store.suppress(cpu_load(), "cpu", t() + Duration::hours(1));
    h.store.suppress(cpu_load(), "cpu", t() + Duration::minutes(1));

    h.store.sweep(t() + Duration::minutes(2));
    assert!(!h.store.is_suppressed(&cpu_load(), "cpu"));
}

#[test]
fn test_unsuppress_unknown_source_is_silent() {
    let h = Harness::new();

    h.store.unsuppress(&cpu_load(), "cpu");
    h.store.unsuppress(&cpu_load(), "never-seen");

    assert!(h.events().is_empty());
}

#[test]
fn test_suppress_in_past_is_muted_until_sweep() {
    let h = Harness::new();

    h.store.suppress(cpu_load(), "cpu", t() - Duration::days(1));

    assert!(h.store.is_suppressed(&cpu_load(), "cpu"));
    assert_eq!(h.events().len(), 1);
}

#[test]
fn test_sweep_visits_all_channels() {
    let h = Harness::new();
    let channels = ["cpu", "disk", "net", "gpu"];

    for (i, channel) in channels.iter().enumerate() {
        h.store.suppress(cpu_load(), channel, t() + Duration::minutes(i as i64));
    }
    h.events.lock().unwrap().clear();

    assert_eq!(h.store.sweep(t() + Duration::minutes(2)), 3);

    let mut unmuted: Vec<String> = h.events().iter().map(|e| e.channel().to_string()).collect();
    unmuted.sort();
    assert_eq!(unmuted, vec!["cpu", "disk", "net"]);
    assert_eq!(h.store.channels(), vec!["gpu".to_string()]);
}

#[test]
fn test_snapshot_reload_is_identity() {
    let h = Harness::new();
    h.store.suppress(cpu_load(), "cpu", t() + Duration::minutes(5));
    h.store.suppress(
        SuppressionKey::new(SourceType::String, "status", "State"),
        "services",
        t() + Duration::minutes(50),
    );

    let snapshot = h.store.snapshot();
    h.store.load_snapshot(h.store.snapshot());

    assert_eq!(h.store.snapshot(), snapshot);
}

#[test]
fn test_restart_through_gateway() {
    let gateway = MemoryGateway::new();

    let first = Harness::new();
    first.store.suppress(cpu_load(), "cpu", t() + Duration::minutes(30));
    first.store.persist(&gateway).unwrap();
    drop(first);

    let second = Harness::new();
    second.clock.set(t() + Duration::minutes(10));
    second.store.restore(&gateway).unwrap();

    assert!(second.store.is_suppressed(&cpu_load(), "cpu"));
    assert_eq!(
        second.events(),
        vec![SuppressionEvent::Suppressed {
            key: cpu_load(),
            channel: "cpu".to_string(),
            expires_at: t() + Duration::minutes(30),
        }]
    );
}
