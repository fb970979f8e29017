//! Log output of mute transitions and persistence.

use alert_mute::infrastructure::mocks::{MemoryGateway, MockCaptureLayer, MockClock};
use alert_mute::{SourceType, SuppressionKey, SuppressionStore};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_transitions_are_logged_with_channel_and_source() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    let store = SuppressionStore::new(Arc::new(MockClock::new(now)));
    let key = SuppressionKey::new(SourceType::Int, "queue", "Length");

    tracing::subscriber::with_default(subscriber, || {
        store.suppress(key.clone(), "broker", now + Duration::minutes(1));
        store.sweep(now + Duration::minutes(1));
    });

    let suppressed = capture.with_message("source suppressed");
    assert_eq!(suppressed.len(), 1);
    assert_eq!(suppressed[0].level, Level::DEBUG);
    assert_eq!(suppressed[0].field("channel"), Some("broker"));
    assert_eq!(suppressed[0].field("source"), Some("Int:queue (Length)"));

    let expired = capture.with_message("suppression expired");
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].level, Level::DEBUG);
    assert_eq!(expired[0].field("channel"), Some("broker"));
    assert_eq!(expired[0].field("source"), Some("Int:queue (Length)"));

    let swept = capture.with_message("expired suppressions removed");
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].field("count"), Some("1"));
}

#[test]
fn test_persistence_outcomes_are_logged() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let store = SuppressionStore::new(Arc::new(MockClock::new(Utc::now())));
    let gateway = MemoryGateway::new();

    tracing::subscriber::with_default(subscriber, || {
        store.restore(&gateway).unwrap();
        store.persist(&gateway).unwrap();

        gateway.fail_loads("unreadable");
        gateway.fail_saves("disk full");
        assert!(store.restore(&gateway).is_err());
        assert!(store.persist(&gateway).is_err());
    });

    assert_eq!(capture.with_message("suppression configuration loaded").len(), 1);
    assert_eq!(capture.with_message("suppression configuration saved").len(), 1);

    let failures: Vec<_> = capture
        .get_captured()
        .into_iter()
        .filter(|e| e.level == Level::ERROR)
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].field("error").unwrap().contains("unreadable"));
    assert!(failures[1].field("error").unwrap().contains("disk full"));
}
