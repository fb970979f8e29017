//! Synchronous fan-out of mute state transitions.
//!
//! Handlers are invoked on the emitting thread, in subscription order, once
//! per event and in emission order. A `Subscription` unregisters its handler
//! when dropped. A panicking handler is logged and skipped; the remaining
//! handlers still receive the event.

use crate::domain::event::SuppressionEvent;
use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

/// Callback receiving suppression events.
pub type EventHandler = Arc<dyn Fn(&SuppressionEvent) + Send + Sync + 'static>;

struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, EventHandler)>>,
}

impl BusInner {
    fn lock_handlers(&self) -> MutexGuard<'_, Vec<(u64, EventHandler)>> {
        self.handlers.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Default for BusInner {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
        }
    }
}

/// Registry of event handlers.
///
/// Cloning yields another handle to the same set of subscribers.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It stays registered until the returned
    /// `Subscription` is dropped or `unsubscribe`d.
    #[must_use = "dropping the subscription immediately unregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SuppressionEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.lock_handlers().push((id, Arc::new(handler)));

        Subscription {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock_handlers().len()
    }

    /// Deliver one event to every handler.
    pub fn publish(&self, event: &SuppressionEvent) {
        // Handlers run outside the lock so they may subscribe or drop subscriptions.
        let handlers: Vec<EventHandler> = self
            .inner
            .lock_handlers()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            let delivered = panic::catch_unwind(panic::AssertUnwindSafe(|| handler(event)));
            if delivered.is_err() {
                error!(
                    channel = event.channel(),
                    source = %event.key(),
                    "suppression event handler panicked"
                );
            }
        }
    }

    /// Deliver a batch of events in order.
    pub fn publish_all(&self, events: &[SuppressionEvent]) {
        for event in events {
            self.publish(event);
        }
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered handler. Unsubscribes on drop.
pub struct Subscription {
    inner: Arc<BusInner>,
    id: u64,
}

impl Subscription {
    /// Unregister the handler now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut handlers = self.inner.lock_handlers();
        if let Some(index) = handlers.iter().position(|(id, _)| *id == self.id) {
            // `remove` keeps the remaining handlers in subscription order.
            handlers.remove(index);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::key::{SourceType, SuppressionKey};

    fn unsuppressed(name: &str) -> SuppressionEvent {
        SuppressionEvent::Unsuppressed {
            key: SuppressionKey::new(SourceType::Int, name, "Count"),
            channel: "main".to_string(),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = NotificationBus::new();
        bus.publish(&unsuppressed("a"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_handlers_called_in_subscription_order() {
        let bus = NotificationBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log1 = Arc::clone(&log);
        let _s1 = bus.subscribe(move |e| {
            log1.lock().unwrap().push(format!("1:{}", e.key().name()));
        });
        let log2 = Arc::clone(&log);
        let _s2 = bus.subscribe(move |e| {
            log2.lock().unwrap().push(format!("2:{}", e.key().name()));
        });

        bus.publish_all(&[unsuppressed("a"), unsuppressed("b")]);

        assert_eq!(*log.lock().unwrap(), vec!["1:a", "2:a", "1:b", "2:b"]);
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicU64::new(0));

        let count_clone = Arc::clone(&count);
        let sub = bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(&unsuppressed("a"));

        sub.unsubscribe();
        bus.publish(&unsuppressed("b"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribing_middle_handler_keeps_order() {
        let bus = NotificationBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut subs = Vec::new();
        for i in 0..3 {
            let log = Arc::clone(&log);
            subs.push(bus.subscribe(move |_| log.lock().unwrap().push(i)));
        }

        let middle = subs.remove(1);
        drop(middle);
        bus.publish(&unsuppressed("a"));

        assert_eq!(*log.lock().unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_panicking_handler_does_not_starve_others() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicU64::new(0));

        let _failing = bus.subscribe(|_| panic!("handler failure"));
        let count_clone = Arc::clone(&count);
        let _counting = bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&unsuppressed("a"));
        bus.publish(&unsuppressed("b"));

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = NotificationBus::new();
        let other = bus.clone();
        let _sub = other.subscribe(|_| {});

        assert_eq!(bus.subscriber_count(), 1);
    }
}
