//! # Joining a batch of start/stop units.
//!
//! [`join_batch`] awaits **every** unit of a batch (a full join, never a race) in
//! completion order and publishes one event per unit. The first failure observed
//! becomes the batch's representative error; the rest are only visible on the bus,
//! plus a `BatchFailures` event when more than one unit failed.
//!
//! ```text
//! units ──► FuturesUnordered ──► for each completion:
//!                                  ├─ Ok   ─► publish ServiceStarted / ServiceStopped
//!                                  └─ Err  ─► publish ServiceStartFailed / ServiceStopFailed
//!                                             (stop timeout: StopTimeoutHit first)
//!                                             first? keep as representative
//! after join: failures > 1 ─► publish BatchFailures { count }
//! ```

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::{JoinError, JoinHandle};

use crate::error::{RuntimeError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;

/// Which lifecycle direction a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Start,
    Stop,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }

    fn succeeded(self) -> EventKind {
        match self {
            Phase::Start => EventKind::ServiceStarted,
            Phase::Stop => EventKind::ServiceStopped,
        }
    }

    fn failed(self) -> EventKind {
        match self {
            Phase::Start => EventKind::ServiceStartFailed,
            Phase::Stop => EventKind::ServiceStopFailed,
        }
    }
}

/// A submitted unit: registry key plus its join handle.
pub(crate) type Unit = (Arc<str>, JoinHandle<Result<(), ServiceError>>);

/// Aggregated result of one batch.
#[derive(Debug, Default)]
pub(crate) struct BatchOutcome {
    first: Option<(Arc<str>, ServiceError)>,
    failures: usize,
}

impl BatchOutcome {
    fn record(&mut self, service: Arc<str>, error: ServiceError) {
        self.failures += 1;
        if self.first.is_none() {
            self.first = Some((service, error));
        }
    }

    /// Number of failed units.
    pub(crate) fn failures(&self) -> usize {
        self.failures
    }

    /// Converts into the caller-facing result for `phase`.
    pub(crate) fn into_result(self, phase: Phase) -> Result<(), RuntimeError> {
        let failures = self.failures;
        match self.first {
            None => Ok(()),
            Some((service, error)) => {
                let service = service.to_string();
                Err(match phase {
                    Phase::Start => RuntimeError::ServiceStart {
                        service,
                        error,
                        failures,
                    },
                    Phase::Stop => RuntimeError::ServiceStop {
                        service,
                        error,
                        failures,
                    },
                })
            }
        }
    }
}

/// Awaits every unit and aggregates failures, publishing per-unit events to `bus`.
pub(crate) async fn join_batch(units: Vec<Unit>, phase: Phase, bus: &Bus) -> BatchOutcome {
    let mut pending: FuturesUnordered<_> = units
        .into_iter()
        .map(|(service, handle)| async move { (service, handle.await) })
        .collect();

    let mut outcome = BatchOutcome::default();
    while let Some((service, joined)) = pending.next().await {
        match joined.unwrap_or_else(|je| Err(from_join_error(je))) {
            Ok(()) => {
                bus.publish(Event::new(phase.succeeded()).with_service(Arc::clone(&service)));
            }
            Err(error) => {
                if let (Phase::Stop, ServiceError::Timeout { timeout }) = (phase, &error) {
                    bus.publish(
                        Event::new(EventKind::StopTimeoutHit)
                            .with_service(Arc::clone(&service))
                            .with_timeout(*timeout),
                    );
                }
                bus.publish(
                    Event::new(phase.failed())
                        .with_service(Arc::clone(&service))
                        .with_reason(error.as_message()),
                );
                outcome.record(service, error);
            }
        }
    }

    if outcome.failures() > 1 {
        bus.publish(
            Event::new(EventKind::BatchFailures)
                .with_count(outcome.failures())
                .with_reason(phase.label()),
        );
    }
    outcome
}

fn from_join_error(je: JoinError) -> ServiceError {
    if je.is_panic() {
        let payload = je.into_panic();
        ServiceError::Panicked {
            info: panic_message(&*payload),
        }
    } else {
        ServiceError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unit(name: &str, delay_ms: u64, res: Result<(), ServiceError>) -> Unit {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            res
        });
        (Arc::from(name), handle)
    }

    #[tokio::test]
    async fn first_observed_failure_is_representative() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let units = vec![
            unit("a", 40, Err(ServiceError::fail("late"))),
            unit("b", 0, Ok(())),
            unit("c", 5, Err(ServiceError::fail("early"))),
        ];

        let outcome = join_batch(units, Phase::Start, &bus).await;
        assert_eq!(outcome.failures(), 2);

        let err = outcome.into_result(Phase::Start).unwrap_err();
        match err {
            RuntimeError::ServiceStart {
                service,
                error,
                failures,
            } => {
                assert_eq!(service, "c");
                assert_eq!(error, ServiceError::fail("early"));
                assert_eq!(failures, 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut failed = 0;
        let mut batch = None;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::ServiceStartFailed => failed += 1,
                EventKind::BatchFailures => batch = ev.count,
                _ => {}
            }
        }
        assert_eq!(failed, 2);
        assert_eq!(batch, Some(2));
    }

    #[tokio::test]
    async fn panics_are_reported_as_failures() {
        let bus = Bus::new(8);
        let handle: JoinHandle<Result<(), ServiceError>> = tokio::spawn(async { panic!("kaboom") });
        let outcome = join_batch(vec![(Arc::from("p"), handle)], Phase::Stop, &bus).await;

        match outcome.into_result(Phase::Stop) {
            Err(RuntimeError::ServiceStop { error, failures, .. }) => {
                assert_eq!(
                    error,
                    ServiceError::Panicked {
                        info: "kaboom".into()
                    }
                );
                assert_eq!(failures, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_timeouts_are_announced() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let budget = Duration::from_millis(10);
        let units = vec![unit("slow", 0, Err(ServiceError::Timeout { timeout: budget }))];
        let _ = join_batch(units, Phase::Stop, &bus).await;

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind, EventKind::StopTimeoutHit);
        assert_eq!(first.timeout_ms, Some(10));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::ServiceStopFailed);
    }

    #[tokio::test]
    async fn empty_batch_succeeds() {
        let bus = Bus::new(8);
        let outcome = join_batch(Vec::new(), Phase::Stop, &bus).await;
        assert!(outcome.into_result(Phase::Stop).is_ok());
    }
}
