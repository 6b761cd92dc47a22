//! # Application: concurrent start/stop of registered services.
//!
//! The [`Application`] owns the managed services (in registration order), the
//! optional listener, a [`WorkerPool`] and the event [`Bus`].
//!
//! ## Start
//! ```text
//! start():
//!   closed?                          ─► Ok(self), no work
//!   first caller spawns the run, every caller awaits its shared outcome:
//!     for (key, managed) in registration order:
//!         publish ServiceStarting; pool.submit(managed.start())
//!     join_batch(units)               (full join; first failure is representative)
//!       └─ Err ─► return Err(ServiceStart)      (listener is never started)
//!     listener.start()                (only now, after every service started)
//!       └─ Ok(addr) ─► publish ListenerStarted
//! ```
//!
//! ## Stop
//! ```text
//! stop():
//!   first caller flips `closed` (CAS) and spawns the run, every caller awaits it:
//!     listener.shutdown()             (bounded by Config::listener_grace)
//!     for (key, managed) in REVERSE registration order:
//!         publish ServiceStopSubmitted; pool.submit_within(stop_timeout, managed.stop())
//!     join_batch(units)               (failures do not skip the next step)
//!     pool.shutdown(pool_grace)       (drain ─► force-cancel ─► report)
//!     return listener error, else service stop error, else Ok(self)
//! ```
//!
//! Both runs live in their own tasks: a caller that stops waiting (a dropped
//! future, an outer timeout) does not abort them.
//!
//! Stop submission follows reverse registration order, but the units then run
//! concurrently; completion order is not guaranteed. The stop budget covers the
//! wait for a pool permit, so `stop()` completes even when stuck start units
//! hold every permit.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::core::alive::{AliveTracker, ServiceState};
use crate::core::batch::{Phase, Unit, join_batch};
use crate::core::config::Config;
use crate::core::managed::ManagedService;
use crate::core::pool::{PoolShutdown, WorkerPool};
use crate::core::{builder::ApplicationBuilder, shutdown};
use crate::error::{ListenerError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::listener::{ListenerInfo, ListenerRef};
use crate::services::{Component, Registry};
use crate::subscribers::{Subscribe, SubscriberSet, panic_message};

type Outcome = Result<(), RuntimeError>;
type SharedRun = Shared<BoxFuture<'static, Outcome>>;

/// Orchestrates start/stop of every registered service and the optional listener.
pub struct Application {
    lifecycle: Arc<Lifecycle>,
    registry: Registry,
    start_run: OnceLock<SharedRun>,
    stop_run: OnceLock<SharedRun>,
}

/// State shared between the application handle and its spawned runs.
struct Lifecycle {
    cfg: Config,
    bus: Bus,
    managed: Vec<(Arc<str>, Arc<ManagedService>)>,
    listener: Option<ListenerRef>,
    /// Held across `listener.start()` and `listener.shutdown()`; `true` while started.
    listener_gate: Mutex<bool>,
    /// Set once stop has claimed the listener; a start finishing later shuts it down itself.
    listener_retired: AtomicBool,
    pool: WorkerPool,
    alive: Arc<AliveTracker>,
    closed: AtomicBool,
    runtime_token: CancellationToken,
}

impl Application {
    /// Returns a builder for an application with the given configuration.
    pub fn builder(cfg: Config) -> ApplicationBuilder {
        ApplicationBuilder::new(cfg)
    }

    /// Creates the application; called by [`ApplicationBuilder::build`].
    ///
    /// Must be called inside a Tokio runtime (spawns the event listener).
    pub(crate) fn new_internal(
        cfg: Config,
        registry: Registry,
        listener: Option<ListenerRef>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let managed = registry
            .services()
            .map(|(key, service)| (Arc::from(key), Arc::new(ManagedService::new(Arc::clone(service)))))
            .collect();
        let pool = WorkerPool::new(cfg.pool_size_resolved());

        let lifecycle = Arc::new(Lifecycle {
            cfg,
            bus,
            managed,
            listener,
            listener_gate: Mutex::new(false),
            listener_retired: AtomicBool::new(false),
            pool,
            alive: Arc::new(AliveTracker::new()),
            closed: AtomicBool::new(false),
            runtime_token: CancellationToken::new(),
        });
        lifecycle.event_listener(subs);

        Self {
            lifecycle,
            registry,
            start_run: OnceLock::new(),
            stop_run: OnceLock::new(),
        }
    }

    /// Starts every managed service concurrently, then the listener.
    ///
    /// Concurrent and repeated callers share the outcome of the first call.
    /// After [`stop`](Self::stop) this is a no-op.
    pub async fn start(&self) -> Result<&Self, RuntimeError> {
        if self.is_closed() {
            return Ok(self);
        }
        let run = self
            .start_run
            .get_or_init(|| {
                let lifecycle = Arc::clone(&self.lifecycle);
                spawn_shared(async move { lifecycle.run_start().await })
            })
            .clone();
        run.await.map(|()| self)
    }

    /// Stops the listener, then every managed service concurrently, then the worker pool.
    ///
    /// Only the first call performs the teardown; every caller observes its outcome.
    pub async fn stop(&self) -> Result<&Self, RuntimeError> {
        let run = self
            .stop_run
            .get_or_init(|| {
                let lifecycle = Arc::clone(&self.lifecycle);
                let first = lifecycle.close();
                spawn_shared(async move {
                    if first {
                        lifecycle.run_stop().await
                    } else {
                        Ok(())
                    }
                })
            })
            .clone();
        run.await.map(|()| self)
    }

    /// Starts, waits for a termination signal, then stops.
    ///
    /// A failed start still triggers a full stop; the start error is returned.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        if let Err(err) = self.start().await {
            let _ = self.stop().await;
            return Err(err);
        }

        if let Err(err) = shutdown::wait_for_shutdown_signal().await {
            tracing::error!(target: "appvisor", error = %err, "signal registration failed; stopping");
        }
        self.lifecycle.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.stop().await.map(|_| ())
    }

    /// True once `stop()` has been called.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.closed.load(Ordering::Acquire)
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.lifecycle.cfg
    }

    /// Every registered component (services and opaque objects).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Component registered under `key`.
    pub fn get_service(&self, key: &str) -> Option<&Component> {
        self.registry.get(key)
    }

    /// Instance registered under `key`, if it has concrete type `T`.
    pub fn get_service_as<T: std::any::Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.registry.get_as::<T>(key)
    }

    /// Instance registered under `T`'s type name.
    pub fn get_service_typed<T: std::any::Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.registry.get_typed::<T>()
    }

    /// Idempotency wrapper of the managed service registered under `key`.
    pub fn managed(&self, key: &str) -> Option<&ManagedService> {
        self.lifecycle
            .managed
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, m)| m.as_ref())
    }

    /// Listener facts; all fields absent when no listener is configured.
    pub fn listener_info(&self) -> ListenerInfo {
        self.lifecycle
            .listener
            .as_deref()
            .map(ListenerInfo::from_listener)
            .unwrap_or_default()
    }

    /// Raw receiver of subsequent runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.lifecycle.bus.subscribe()
    }

    /// Last known state of the service registered under `key`.
    pub async fn service_state(&self, key: &str) -> Option<ServiceState> {
        self.lifecycle.alive.state(key).await
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("services", &self.lifecycle.managed.len())
            .field("listener", &self.lifecycle.listener.is_some())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.lifecycle.runtime_token.cancel();
    }
}

/// Runs `run` on its own task; every clone of the result awaits the same outcome.
fn spawn_shared<F>(run: F) -> SharedRun
where
    F: Future<Output = Outcome> + Send + 'static,
{
    let handle = tokio::spawn(run);
    async move {
        handle.await.unwrap_or_else(|je| {
            let info = if je.is_panic() {
                panic_message(&*je.into_panic())
            } else {
                "aborted".to_string()
            };
            Err(RuntimeError::Interrupted { info })
        })
    }
    .boxed()
    .shared()
}

impl Lifecycle {
    /// Forwards bus events to the alive tracker and the subscriber set until teardown ends.
    fn event_listener(&self, subs: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let alive = Arc::clone(&self.alive);
        let token = self.runtime_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => {
                            alive.update(&ev).await;
                            subs.emit(&ev);
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            subs.shutdown().await;
        });
    }

    /// Flips `closed`; true for the caller that won the transition.
    fn close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn run_start(&self) -> Outcome {
        let (units, submit_err) = self.submit_batch(self.managed.iter(), Phase::Start);
        let joined = join_batch(units, Phase::Start, &self.bus).await;
        if let Some(err) = submit_err {
            return Err(err);
        }
        joined.into_result(Phase::Start)?;
        self.start_listener().await
    }

    async fn run_stop(&self) -> Outcome {
        let listener_res = self.stop_listener().await;

        let (units, submit_err) = self.submit_batch(self.managed.iter().rev(), Phase::Stop);
        let stop_res = join_batch(units, Phase::Stop, &self.bus)
            .await
            .into_result(Phase::Stop);

        self.teardown_pool().await;
        self.runtime_token.cancel();

        listener_res
            .and(submit_err.map_or(Ok(()), Err))
            .and(stop_res)
    }

    /// Submits one unit per service in iteration order; stops submitting if the pool is closed.
    fn submit_batch<'a, I>(&self, services: I, phase: Phase) -> (Vec<Unit>, Option<RuntimeError>)
    where
        I: Iterator<Item = &'a (Arc<str>, Arc<ManagedService>)>,
    {
        let mut units = Vec::with_capacity(self.managed.len());
        for (key, managed) in services {
            let managed = Arc::clone(managed);
            let submitted = match phase {
                Phase::Start => {
                    self.bus
                        .publish(Event::new(EventKind::ServiceStarting).with_service(Arc::clone(key)));
                    self.pool
                        .submit(Arc::clone(key), async move { managed.start().await })
                }
                Phase::Stop => {
                    let budget = self.cfg.stop_timeout;
                    self.bus.publish(
                        Event::new(EventKind::ServiceStopSubmitted)
                            .with_service(Arc::clone(key))
                            .with_timeout(budget),
                    );
                    self.pool.submit_within(Arc::clone(key), budget, async move {
                        managed.stop(budget).await
                    })
                }
            };
            match submitted {
                Ok(handle) => units.push((Arc::clone(key), handle)),
                Err(err) => return (units, Some(err)),
            }
        }
        (units, None)
    }

    async fn start_listener(&self) -> Outcome {
        let Some(listener) = &self.listener else {
            return Ok(());
        };
        let mut started = self.listener_gate.lock().await;
        if *started || self.listener_retired.load(Ordering::Acquire) {
            return Ok(());
        }

        let addr = match listener.start().await {
            Ok(addr) => addr,
            Err(error) => {
                self.bus
                    .publish(Event::new(EventKind::ListenerFailed).with_reason(error.to_string()));
                return Err(error.into());
            }
        };
        self.bus
            .publish(Event::new(EventKind::ListenerStarted).with_reason(addr.to_string()));

        if self.listener_retired.load(Ordering::Acquire) {
            // stop claimed the listener while it was binding; the gate stays held
            let _ = self.publish_listener_shutdown(listener.shutdown().await);
            return Ok(());
        }
        *started = true;
        Ok(())
    }

    async fn stop_listener(&self) -> Outcome {
        let Some(listener) = &self.listener else {
            return Ok(());
        };
        self.listener_retired.store(true, Ordering::Release);

        let shutdown = async {
            let mut started = self.listener_gate.lock().await;
            if !std::mem::take(&mut *started) {
                return None;
            }
            Some(listener.shutdown().await)
        };
        let res = match self.cfg.listener_timeout() {
            Some(grace) => tokio::time::timeout(grace, shutdown)
                .await
                .unwrap_or(Some(Err(ListenerError::ShutdownTimeout { timeout: grace }))),
            None => shutdown.await,
        };
        match res {
            None => Ok(()),
            Some(res) => self.publish_listener_shutdown(res).map_err(RuntimeError::from),
        }
    }

    fn publish_listener_shutdown(&self, res: Result<(), ListenerError>) -> Result<(), ListenerError> {
        match &res {
            Ok(()) => self.bus.publish(Event::new(EventKind::ListenerStopped)),
            Err(error) => self
                .bus
                .publish(Event::new(EventKind::ListenerFailed).with_reason(error.to_string())),
        };
        res
    }

    /// Shuts the worker pool down and reports (never raises) the outcome.
    async fn teardown_pool(&self) {
        let grace = self.cfg.pool_grace;
        match self.pool.shutdown(grace).await {
            PoolShutdown::Drained => {
                self.bus.publish(Event::new(EventKind::PoolDrained));
            }
            PoolShutdown::Cancelled { outstanding } => self.publish_force_cancel(outstanding, grace),
            PoolShutdown::NotTerminated { outstanding, stuck } => {
                self.publish_force_cancel(outstanding, grace);
                self.bus.publish(
                    Event::new(EventKind::PoolNotTerminated)
                        .with_count(outstanding)
                        .with_reason(stuck.join(",")),
                );
            }
        }
    }

    fn publish_force_cancel(&self, outstanding: usize, grace: Duration) {
        self.bus.publish(
            Event::new(EventKind::PoolForceCancelled)
                .with_count(outstanding)
                .with_timeout(grace),
        );
    }
}
