//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the application, its
//! worker pool units and the listener glue.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Application`, start/stop units, `WorkerPool` teardown,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the application's subscriber listener (fans out to `SubscriberSet`
//!   and updates `AliveTracker`) and raw receivers from `Application::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
