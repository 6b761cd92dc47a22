//! # Event subscribers for the appvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for handling runtime events broadcast through
//! the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! start/stop units ── publish(Event) ──► Bus ──► application listener
//!                                                   │
//!                                                   ├──► AliveTracker (running services)
//!                                                   └──► SubscriberSet::emit(&Event)
//!                                                            ├──► LogWriter
//!                                                            └──► custom ...
//! ```

mod embedded;
mod subscribe;
mod subscriber_set;

pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;
