//! # Runtime events emitted by the application orchestrator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Service events**: start/stop flow of managed services (starting, started, failed, timeout)
//! - **Listener events**: network listener start and shutdown
//! - **Teardown events**: worker pool drain and shutdown outcome
//! - **Subscriber events**: delivery problems of the fan-out itself
//!
//! The [`Event`] struct carries additional metadata such as timestamps, service key,
//! reasons, timeouts and failure counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StopTimeoutHit)
//!     .with_service("db")
//!     .with_reason("slow flush")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::StopTimeoutHit);
//! assert_eq!(ev.service.as_deref(), Some("db"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Service start events ===
    /// A start unit for the service was submitted to the worker pool.
    ///
    /// Sets:
    /// - `service`: registry key
    ServiceStarting,

    /// The service's start call completed successfully.
    ///
    /// Sets:
    /// - `service`: registry key
    ServiceStarted,

    /// The service's start call failed.
    ///
    /// Sets:
    /// - `service`: registry key
    /// - `reason`: failure message
    ServiceStartFailed,

    // === Service stop events ===
    /// A stop unit for the service was submitted to the worker pool.
    ///
    /// Submission follows reverse registration order; completion order is not guaranteed.
    ///
    /// Sets:
    /// - `service`: registry key
    /// - `timeout_ms`: stop budget (ms)
    ServiceStopSubmitted,

    /// The service's stop call completed successfully.
    ///
    /// Sets:
    /// - `service`: registry key
    ServiceStopped,

    /// The service's stop call failed (including timeout and cancellation).
    ///
    /// Sets:
    /// - `service`: registry key
    /// - `reason`: failure message
    ServiceStopFailed,

    /// The service's stop call exceeded its budget (always followed by `ServiceStopFailed`).
    ///
    /// Sets:
    /// - `service`: registry key
    /// - `timeout_ms`: stop budget (ms)
    StopTimeoutHit,

    /// More than one unit of a start/stop batch failed; only the first is returned to the caller.
    ///
    /// Sets:
    /// - `count`: number of failed units
    /// - `reason`: `"start"` or `"stop"`
    BatchFailures,

    // === Listener events ===
    /// The listener is bound and accepting.
    ///
    /// Sets:
    /// - `reason`: bound address
    ListenerStarted,

    /// The listener completed its shutdown.
    ListenerStopped,

    /// The listener failed to start or to shut down.
    ///
    /// Sets:
    /// - `reason`: failure message
    ListenerFailed,

    // === Teardown events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// All pool work drained within the first grace period.
    PoolDrained,

    /// Grace period exceeded; outstanding pool work was force-cancelled.
    ///
    /// Sets:
    /// - `count`: outstanding units at cancellation time
    /// - `timeout_ms`: grace period (ms)
    PoolForceCancelled,

    /// Pool work did not drain even after force-cancellation.
    ///
    /// Sets:
    /// - `count`: outstanding units
    /// - `reason`: services still marked running
    PoolNotTerminated,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Registry key of the service (or subscriber name), if applicable.
    pub service: Option<Arc<str>>,
    /// Human-readable reason (errors, addresses, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Timeout or grace budget in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Counter payload (failures, outstanding units).
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
            timeout_ms: None,
            count: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a service key.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for per-service failure events (start, stop or listener).
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ServiceStartFailed | EventKind::ServiceStopFailed | EventKind::ListenerFailed
        )
    }
}
