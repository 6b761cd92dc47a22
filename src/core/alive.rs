//! # Service state tracker with sequence-based ordering.
//!
//! Maintains the last known lifecycle state of every managed service,
//! using event sequence numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! Application ──► Bus ──► event listener ──► AliveTracker::update()
//!                                                   │
//!                                                   ▼
//!                                      HashMap<String, ServiceSlot>
//!                                          (key → {seq, state})
//! ```
//!
//! ## Rules
//! - Only service events change state; other events are ignored
//! - Read operations (`snapshot`, `state`) are **eventually consistent**
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

/// Last known state of a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Start unit submitted.
    Starting,
    /// Start completed successfully.
    Running,
    /// Start failed; the service still receives a stop.
    Unhealthy,
    /// Stop unit submitted and not completed yet.
    Stopping,
    /// Stop completed (successfully or not).
    Stopped,
}

#[derive(Debug, Clone)]
struct ServiceSlot {
    last_seq: u64,
    state: ServiceState,
}

/// Thread-safe tracker of service states.
#[derive(Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, ServiceSlot>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is a service event newer than the last one seen for that service.
    ///
    /// Returns `true` if the state changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let next = match ev.kind {
            EventKind::ServiceStarting => ServiceState::Starting,
            EventKind::ServiceStarted => ServiceState::Running,
            EventKind::ServiceStartFailed => ServiceState::Unhealthy,
            EventKind::ServiceStopSubmitted => ServiceState::Stopping,
            EventKind::ServiceStopped | EventKind::ServiceStopFailed => ServiceState::Stopped,
            _ => return false,
        };
        let Some(name) = ev.service.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        match state.get_mut(name) {
            Some(slot) if ev.seq <= slot.last_seq => false,
            Some(slot) => {
                slot.last_seq = ev.seq;
                slot.state = next;
                true
            }
            None => {
                state.insert(
                    name.to_string(),
                    ServiceSlot {
                        last_seq: ev.seq,
                        state: next,
                    },
                );
                true
            }
        }
    }

    /// Returns the last known state of `name`.
    pub async fn state(&self, name: &str) -> Option<ServiceState> {
        self.state.read().await.get(name).map(|slot| slot.state)
    }

    /// Returns sorted names of services currently in `wanted`.
    ///
    /// Used with [`ServiceState::Stopping`] to name services whose stop never completed.
    pub async fn snapshot(&self, wanted: ServiceState) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state
            .iter()
            .filter(|(_, slot)| slot.state == wanted)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let starting = Event::new(EventKind::ServiceStarting).with_service("db");
        let started = Event::new(EventKind::ServiceStarted).with_service("db");

        assert!(tracker.update(&started).await);
        assert!(!tracker.update(&starting).await);
        assert_eq!(tracker.state("db").await, Some(ServiceState::Running));
    }

    #[tokio::test]
    async fn snapshot_lists_services_stuck_in_stopping() {
        let tracker = AliveTracker::new();
        for name in ["b", "a", "c"] {
            tracker
                .update(&Event::new(EventKind::ServiceStopSubmitted).with_service(name))
                .await;
        }
        tracker
            .update(&Event::new(EventKind::ServiceStopped).with_service("c"))
            .await;

        assert_eq!(tracker.snapshot(ServiceState::Stopping).await, ["a", "b"]);
        assert!(!tracker.update(&Event::new(EventKind::PoolDrained)).await);
        assert!(tracker.state("zzz").await.is_none());
    }
}
