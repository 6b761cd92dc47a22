//! # LogWriter: event renderer over `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into `tracing` records with
//! structured fields. It never installs a global subscriber; the process entry
//! point does that once (e.g. `tracing_subscriber::fmt().init()`).
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO appvisor: service started service="db"
//! WARN appvisor: service stop timed out service="cache" timeout_ms=30000
//! ERROR appvisor: service failed to start service="mailer" reason="error: refused"
//! WARN appvisor: multiple failures in batch count=2 phase="start"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ServiceStarting => {
                tracing::debug!(target: "appvisor", service, "service starting");
            }
            EventKind::ServiceStarted => {
                tracing::info!(target: "appvisor", service, "service started");
            }
            EventKind::ServiceStartFailed => {
                tracing::error!(target: "appvisor", service, reason, "service failed to start");
            }
            EventKind::ServiceStopSubmitted => {
                tracing::debug!(target: "appvisor", service, timeout_ms = e.timeout_ms, "service stopping");
            }
            EventKind::ServiceStopped => {
                tracing::info!(target: "appvisor", service, "service stopped");
            }
            EventKind::ServiceStopFailed => {
                tracing::error!(target: "appvisor", service, reason, "service failed to stop");
            }
            EventKind::StopTimeoutHit => {
                tracing::warn!(target: "appvisor", service, timeout_ms = e.timeout_ms, "service stop timed out");
            }
            EventKind::BatchFailures => {
                tracing::warn!(target: "appvisor", count = e.count, phase = reason, "multiple failures in batch");
            }
            EventKind::ListenerStarted => {
                tracing::info!(target: "appvisor", addr = reason, "listener started");
            }
            EventKind::ListenerStopped => {
                tracing::info!(target: "appvisor", "listener stopped");
            }
            EventKind::ListenerFailed => {
                tracing::error!(target: "appvisor", reason, "listener failure");
            }
            EventKind::ShutdownRequested => {
                tracing::warn!(target: "appvisor", "shutdown requested");
            }
            EventKind::PoolDrained => {
                tracing::debug!(target: "appvisor", "worker pool drained");
            }
            EventKind::PoolForceCancelled => {
                tracing::warn!(target: "appvisor", outstanding = e.count, grace_ms = e.timeout_ms, "worker pool force-cancelled");
            }
            EventKind::PoolNotTerminated => {
                tracing::error!(target: "appvisor", outstanding = e.count, running = reason, "worker pool did not terminate");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "appvisor", subscriber = service, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "appvisor", subscriber = service, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
