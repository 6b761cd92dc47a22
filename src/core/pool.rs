//! # Bounded worker pool for service start/stop units.
//!
//! Every unit is a Tokio task tracked by a [`TaskTracker`]; a [`Semaphore`] caps how
//! many units execute at the same time. All units share one [`CancellationToken`]
//! used for forced cancellation during teardown.
//!
//! ## Shutdown
//! ```text
//! shutdown(grace):
//!   tracker.close()                         (no new units)
//!   ├─ drained within grace      ─► PoolShutdown::Drained
//!   └─ timeout:
//!        cancel.cancel()                    (outstanding units resolve to Cancelled)
//!        ├─ drained within grace ─► PoolShutdown::Cancelled { outstanding }
//!        └─ timeout              ─► PoolShutdown::NotTerminated { outstanding, stuck }
//! ```
//!
//! ## Rules
//! - A unit waiting for a permit is cancellable, as is a running unit.
//! - A budget given to [`WorkerPool::submit_within`] covers the permit wait too.
//! - `submit` after `shutdown` fails with [`RuntimeError::PoolClosed`].
//! - `shutdown` never fails; the outcome is reported as a value naming the
//!   keys of units that survived cancellation.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{RuntimeError, ServiceError};

/// Outcome of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolShutdown {
    /// All units finished within the first grace period.
    Drained,
    /// Units were still running after the first grace period and were cancelled;
    /// they finished within the second one.
    Cancelled {
        /// Units outstanding when cancellation was requested.
        outstanding: usize,
    },
    /// Units were still outstanding after both grace periods.
    NotTerminated {
        /// Units still outstanding.
        outstanding: usize,
        /// Sorted keys of those units.
        stuck: Vec<String>,
    },
}

type InFlight = Arc<Mutex<Vec<(u64, Arc<str>)>>>;

/// Keeps a unit's key listed while its task is alive.
struct InFlightGuard {
    id: u64,
    in_flight: InFlight,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != self.id);
    }
}

/// Bounded pool executing service calls.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    in_flight: InFlight,
    next_id: AtomicU64,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` units at once (minimum 1).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            in_flight: InFlight::default(),
            next_id: AtomicU64::new(0),
            size,
        }
    }

    /// Maximum number of concurrently executing units.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of submitted units that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Sorted keys of submitted units that have not finished yet.
    pub fn in_flight(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, key)| key.to_string())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// True once shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Submits one unit under `key`. The returned handle resolves to the unit's result,
    /// or to [`ServiceError::Cancelled`] if the pool cancelled it.
    pub fn submit<F>(
        &self,
        key: impl Into<Arc<str>>,
        unit: F,
    ) -> Result<JoinHandle<Result<(), ServiceError>>, RuntimeError>
    where
        F: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        self.spawn_unit(key.into(), None, unit)
    }

    /// Like [`submit`](Self::submit), but the unit resolves to [`ServiceError::Timeout`]
    /// once `budget` elapses, whether it is still waiting for a permit or running.
    pub fn submit_within<F>(
        &self,
        key: impl Into<Arc<str>>,
        budget: Duration,
        unit: F,
    ) -> Result<JoinHandle<Result<(), ServiceError>>, RuntimeError>
    where
        F: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        self.spawn_unit(key.into(), Some(budget), unit)
    }

    fn spawn_unit<F>(
        &self,
        key: Arc<str>,
        budget: Option<Duration>,
        unit: F,
    ) -> Result<JoinHandle<Result<(), ServiceError>>, RuntimeError>
    where
        F: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        if self.tracker.is_closed() {
            return Err(RuntimeError::PoolClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, key));
        let guard = InFlightGuard {
            id,
            in_flight: Arc::clone(&self.in_flight),
        };

        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.clone();
        let run = async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
                permit = permits.acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_closed) => return Err(ServiceError::Cancelled),
                },
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ServiceError::Cancelled),
                res = unit => res,
            }
        };

        Ok(self.tracker.spawn(async move {
            let _guard = guard;
            match budget {
                Some(timeout) => tokio::time::timeout(timeout, run)
                    .await
                    .unwrap_or(Err(ServiceError::Timeout { timeout })),
                None => run.await,
            }
        }))
    }

    /// Closes the pool and waits for outstanding units, cancelling them after `grace`.
    pub async fn shutdown(&self, grace: Duration) -> PoolShutdown {
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            return PoolShutdown::Drained;
        }

        let outstanding = self.tracker.len();
        self.cancel.cancel();
        self.permits.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            PoolShutdown::Cancelled { outstanding }
        } else {
            PoolShutdown::NotTerminated {
                outstanding: self.tracker.len(),
                stuck: self.in_flight(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn caps_concurrency_at_pool_size() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit("unit", async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap()
            })
            .collect();

        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.shutdown(Duration::from_secs(1)).await, PoolShutdown::Drained);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(1);
        assert_eq!(pool.shutdown(Duration::from_millis(10)).await, PoolShutdown::Drained);
        assert!(pool.is_closed());
        assert!(matches!(pool.submit("late", async { Ok(()) }), Err(RuntimeError::PoolClosed)));
    }

    #[tokio::test]
    async fn stuck_units_are_cancelled_after_grace() {
        let pool = WorkerPool::new(1);
        let running = pool
            .submit("running", async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .unwrap();
        let queued = pool.submit("queued", async { Ok(()) }).unwrap();
        tokio::task::yield_now().await;

        let outcome = pool.shutdown(Duration::from_millis(50)).await;
        assert_eq!(outcome, PoolShutdown::Cancelled { outstanding: 2 });
        assert_eq!(running.await.unwrap(), Err(ServiceError::Cancelled));
        assert_eq!(queued.await.unwrap(), Err(ServiceError::Cancelled));
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn uncancellable_work_is_reported_not_terminated() {
        let pool = WorkerPool::new(1);
        // blocks its worker thread, so the cancellation branch cannot be polled in time
        let h = pool
            .submit("blocker", async {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let outcome = pool.shutdown(Duration::from_millis(20)).await;
        assert_eq!(
            outcome,
            PoolShutdown::NotTerminated {
                outstanding: 1,
                stuck: vec!["blocker".to_string()],
            }
        );
        let _ = h.await;
        assert!(pool.in_flight().is_empty());
    }

    #[tokio::test]
    async fn budget_covers_the_permit_wait() {
        let pool = WorkerPool::new(1);
        let hog = pool
            .submit("hog", async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .unwrap();
        tokio::task::yield_now().await;

        let waiting = pool
            .submit_within("waiting", Duration::from_millis(30), async { Ok(()) })
            .unwrap();
        assert_eq!(
            waiting.await.unwrap(),
            Err(ServiceError::Timeout {
                timeout: Duration::from_millis(30)
            })
        );
        assert_eq!(pool.in_flight(), ["hog"]);

        assert_eq!(
            pool.shutdown(Duration::from_millis(20)).await,
            PoolShutdown::Cancelled { outstanding: 1 }
        );
        assert_eq!(hog.await.unwrap(), Err(ServiceError::Cancelled));
    }
}
