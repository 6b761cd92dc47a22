//! # appvisor
//!
//! **Appvisor** is a lifecycle runtime for a set of long-lived async services.
//!
//! Services are registered in order. The application starts all of them
//! concurrently and then starts an optional network listener. It shuts the
//! listener down first and then stops all services concurrently, with the
//! stops submitted in reverse registration order. Every start and stop reaches
//! each service at most once, no matter how many callers race.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Service    │   │   Service    │   │  Component   │
//!     │  (key "db")  │   │ (key "cache")│   │   (opaque)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Application (runtime orchestrator)                               │
//! │  - Registry (insertion-ordered key → component)                   │
//! │  - ManagedService per service (at-most-once start/stop)           │
//! │  - WorkerPool (bounded concurrency, graceful/forced shutdown)     │
//! │  - Listener (optional, started last / shut down first)            │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  start unit  │   │  stop unit   │   │  stop unit   │   │
//!     │ (pool task)  │   │ (pool task)  │   │ (pool task)  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ ServiceStarting  │ ServiceStopped   │ StopTimeoutHit  │ ListenerStarted
//!      │ ServiceStarted   │ ServiceStopFailed│ ...             │ PoolDrained ...
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │     event listener     │
//!                       │    (in Application)    │
//!                       └───┬────────────────┬───┘
//!                           ▼                ▼
//!                    AliveTracker     SubscriberSet ──► LogWriter, custom ...
//! ```
//!
//! ### Lifecycle
//! ```text
//! start():  services (concurrent, full join) ──► listener.start()
//! stop():   listener.shutdown() ──► services (reverse submission, concurrent, full join)
//!                               ──► worker pool drain ──► force-cancel ──► report
//! ```
//!
//! A failing batch surfaces **one** representative error (the first failure
//! observed); every individual failure is published on the bus.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{Application, Config, ServiceError, ServiceFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), appvisor::RuntimeError> {
//!     let db = ServiceFn::arc(
//!         || async { Ok::<_, ServiceError>(()) },
//!         |_timeout: Duration| async { Ok::<_, ServiceError>(()) },
//!     );
//!
//!     let app = Application::builder(Config::default())
//!         .service("db", db)
//!         .build();
//!
//!     app.start().await?;
//!     app.stop().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod listener;
mod services;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    AliveTracker, Application, ApplicationBuilder, Config, ManagedService, PoolShutdown, ServiceState,
    WorkerPool, wait_for_shutdown_signal,
};
pub use error::{ListenerError, RuntimeError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use listener::{ConnectionHandler, Listener, ListenerConfig, ListenerInfo, ListenerRef, TcpAcceptor};
pub use services::{AnyRef, Component, DEFAULT_STOP_TIMEOUT, Registry, Service, ServiceFn, ServiceRef, type_key};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
