//! EventBus - fire-and-forget fan-out of [`ConductorEvent`]s.
//!
//! ```text
//! ┌──────────┐ publish  ┌──────────────────┐  recv   ┌────────────┐
//! │ registry │ ───────▶ │ broadcast::Sender│ ──────▶ │ subscriber │
//! │ queue    │          │   (capacity N)   │ ──────▶ │ subscriber │
//! │ rules    │          └──────────────────┘         └────────────┘
//! └──────────┘
//! ```
//!
//! Publishing never blocks and never fails: with no subscriber the
//! event is dropped, and a subscriber that falls more than `capacity`
//! events behind loses the oldest ones (`RecvError::Lagged`).

use conductor_event::ConductorEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Cloneable handle; every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConductorEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: ConductorEvent) {
        trace!(category = %event.category(), "publish event");
        // No receivers is fine.
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConductorEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn opened(system: &str) -> ConductorEvent {
        ConductorEvent::CircuitOpened {
            system: system.into(),
            failures: 3,
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(opened("hvac"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_receives() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();
        bus.publish(opened("hvac"));
        assert_eq!(a.try_recv().unwrap(), opened("hvac"));
        assert_eq!(b.try_recv().unwrap(), opened("hvac"));
        assert_eq!(a.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn lagging_subscriber_loses_oldest() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for name in ["a", "b", "c"] {
            bus.publish(opened(name));
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(1))));
        assert_eq!(rx.try_recv().unwrap(), opened("b"));
    }
}
