use std::sync::Arc;

use crate::{
    core::Config,
    listener::ListenerRef,
    services::{Component, Registry, Service},
    subscribers::Subscribe,
};
use super::application::Application;

/// Builder for constructing an [`Application`].
///
/// Services are started in the order they are added (and stopped in reverse).
/// Re-adding a key replaces the component but keeps its original position.
pub struct ApplicationBuilder {
    cfg: Config,
    registry: Registry,
    listener: Option<ListenerRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ApplicationBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: Registry::new(),
            listener: None,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the runtime configuration.
    pub fn config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the whole registry with a prepared one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers a service under `key`.
    pub fn service<S: Service>(mut self, key: impl Into<String>, service: Arc<S>) -> Self {
        self.registry.put_service(key, service);
        self
    }

    /// Registers an arbitrary component under `key`.
    ///
    /// Opaque components are reachable through lookups but never started or stopped.
    pub fn component(mut self, key: impl Into<String>, component: Component) -> Self {
        self.registry.put(key, component);
        self
    }

    /// Sets the network listener, started last and shut down first.
    ///
    /// Its own [`config`](crate::Listener::config) feeds [`Application::listener_info`].
    pub fn listener(mut self, listener: ListenerRef) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (service lifecycle, listener, pool teardown)
    /// through dedicated workers with bounded queues.
    pub fn subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the application.
    ///
    /// The registry is moved into the application, so later changes to any
    /// registry the caller kept do not affect it. Must be called inside a Tokio runtime.
    pub fn build(self) -> Arc<Application> {
        Arc::new(Application::new_internal(
            self.cfg,
            self.registry,
            self.listener,
            self.subscribers,
        ))
    }
}
