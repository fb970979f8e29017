//! Dashboard-style wiring of the suppression store.
//!
//! Restores mutes from a JSON file next to the system temp dir, mutes a few
//! sources, lets the minute-aligned sweeper run for a short while and saves
//! the remaining mutes on the way out.

use alert_mute::{
    Clock, ExpirySweeper, JsonFileGateway, SourceType, SuppressionEvent, SuppressionKey,
    SuppressionStore, SweeperConfig, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Alert Mute Dashboard Example ===\n");

    let store = Arc::new(SuppressionStore::new(Arc::new(SystemClock::new())));

    // What a channel view would do: repaint rows when their mute state changes.
    let _subscription = store.subscribe(|event| match event {
        SuppressionEvent::Suppressed {
            key,
            channel,
            expires_at,
        } => println!("  [{}] {} muted until {}", channel, key, expires_at),
        SuppressionEvent::Unsuppressed { key, channel } => {
            println!("  [{}] {} alerting again", channel, key)
        }
    });

    let gateway = JsonFileGateway::new(std::env::temp_dir().join("alert-mute-demo.json"));
    println!("Restoring mutes from {}:", gateway.path().display());
    if let Err(e) = store.restore(&gateway) {
        println!("  starting empty: {}", e);
    }

    println!("\nMuting sources:");
    let temp = SuppressionKey::new(SourceType::Double, "core0", "Temperature");
    let fan = SuppressionKey::new(SourceType::UInt, "fan1", "RPM");
    store.suppress_for(temp.clone(), "cpu", Duration::from_secs(15 * 60));
    store.suppress_for(fan.clone(), "cooling", Duration::from_secs(1));
    // Already muted: only the expiry moves, no second notification.
    store.suppress_for(temp.clone(), "cpu", Duration::from_secs(60 * 60));

    let sweeper = ExpirySweeper::new(Arc::clone(&store), SweeperConfig::default());
    let delay = sweeper.initial_delay(store.clock().now());
    info!(first_sweep_in = ?delay, "sweeper starting");
    let handle = sweeper.start();

    println!("\nWaiting for the first aligned sweep ({:?})...", delay);
    tokio::time::sleep(delay + Duration::from_secs(1)).await;

    handle.shutdown().await.expect("shutdown failed");

    println!("\nStill muted in \"cpu\": {:?}", store.suppressed_in("cpu"));
    if let Err(e) = store.persist(&gateway) {
        println!("Could not save mutes: {}", e);
    }

    let metrics = store.metrics().snapshot();
    println!(
        "\nMuted: {}, unmuted manually: {}, expired: {}",
        metrics.suppressions, metrics.unsuppressions, metrics.expirations
    );
    println!("\n=== Example Complete ===");
}
