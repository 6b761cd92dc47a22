//! Runtime core: orchestration and lifecycle.
//!
//! The public entry point is [`Application`], which starts and stops the
//! registered services concurrently, drives the optional listener and tears
//! down its worker pool.
//!
//! Internal modules:
//! - [`application`]: start/stop orchestration and registry lookups;
//! - [`batch`]: full join of a batch of units with failure aggregation;
//! - [`managed`]: at-most-once start/stop wrapper around a service;
//! - [`pool`]: bounded worker pool with graceful then forced shutdown;
//! - [`alive`]: last known state per service, fed from the event bus;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod alive;
mod application;
mod batch;
mod builder;
mod config;
mod managed;
mod pool;
mod shutdown;

pub use alive::{AliveTracker, ServiceState};
pub use application::Application;
pub use builder::ApplicationBuilder;
pub use config::Config;
pub use managed::ManagedService;
pub use pool::{PoolShutdown, WorkerPool};
pub use shutdown::wait_for_shutdown_signal;
