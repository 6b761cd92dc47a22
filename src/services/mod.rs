//! # Services and their registry.
//!
//! - [`Service`] - start/stop contract of a lifecycle-managed unit
//! - [`ServiceFn`] - closure-backed service implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`Component`] - registry entry, either a service or an opaque object
//! - [`Registry`] - insertion-ordered key → component store

mod component;
mod registry;
mod service;
mod service_fn;

pub use component::{AnyRef, Component};
pub use registry::{Registry, type_key};
pub use service::{DEFAULT_STOP_TIMEOUT, Service, ServiceRef};
pub use service_fn::ServiceFn;
