//! # Optional network listener.
//!
//! - [`Listener`] - the boundary the application sequences around its services
//! - [`ListenerConfig`] / [`ListenerInfo`] - configuration in, observable facts out
//! - [`TcpAcceptor`] - minimal TCP implementation handing connections to a [`ConnectionHandler`]

#[allow(clippy::module_inception)]
mod listener;
mod tcp;

pub use listener::{Listener, ListenerConfig, ListenerInfo, ListenerRef};
pub use tcp::{ConnectionHandler, TcpAcceptor};
