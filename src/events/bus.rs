//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (application, pool units, listener glue).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Receivers:
//!   Application ──┐
//!   start unit  ──┼──────► Bus ───────► subscriber listener ────► SubscriberSet
//!   stop unit   ──┤  (broadcast chan) └─► Application::subscribe() (raw receivers)
//!   WorkerPool  ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cloning is cheap; every clone publishes into the same ring buffer.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus keeping up to `capacity` undelivered events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `ev` and returns how many receivers it reached (`0` = dropped).
    pub fn publish(&self, ev: Event) -> usize {
        self.sender.send(ev).unwrap_or(0)
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receivers(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_only_see_events_after_subscribing() {
        let bus = Bus::new(0);
        assert_eq!(bus.publish(Event::new(EventKind::PoolDrained)), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.receivers(), 1);
        assert_eq!(bus.publish(Event::new(EventKind::ShutdownRequested)), 1);

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ShutdownRequested);
        assert!(rx.try_recv().is_err());
    }
}
