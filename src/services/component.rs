//! # Registry entries.
//!
//! A [`Component`] is either a lifecycle-managed [`Service`] or an opaque shared
//! object (configuration, clients, route tables...). The variant is decided at
//! registration time, so the application never inspects types at runtime to find
//! out which entries it has to start and stop.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::services::service::{Service, ServiceRef};

/// Type-erased shared object.
pub type AnyRef = Arc<dyn Any + Send + Sync>;

/// A registered object.
#[derive(Clone)]
pub enum Component {
    /// Lifecycle-managed service.
    Service {
        /// Start/stop view of the instance.
        service: ServiceRef,
        /// Concrete-type view of the same instance, when registered with a known type.
        any: Option<AnyRef>,
        /// Type name captured at registration.
        type_name: &'static str,
    },
    /// Any other shared object.
    Opaque {
        /// The instance.
        any: AnyRef,
        /// Type name captured at registration.
        type_name: &'static str,
    },
}

impl Component {
    /// Wraps a concrete service; typed lookups (`downcast`) keep working.
    pub fn service<S: Service>(service: Arc<S>) -> Self {
        Component::Service {
            service: service.clone(),
            any: Some(service),
            type_name: std::any::type_name::<S>(),
        }
    }

    /// Wraps an already type-erased service; typed lookups return `None`.
    pub fn service_ref(service: ServiceRef) -> Self {
        Component::Service {
            service,
            any: None,
            type_name: std::any::type_name::<dyn Service>(),
        }
    }

    /// Wraps any other shared object.
    pub fn opaque<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Component::Opaque {
            any: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// True for lifecycle-managed entries.
    #[inline]
    pub fn is_service(&self) -> bool {
        matches!(self, Component::Service { .. })
    }

    /// Start/stop view, for service entries.
    pub fn as_service(&self) -> Option<&ServiceRef> {
        match self {
            Component::Service { service, .. } => Some(service),
            Component::Opaque { .. } => None,
        }
    }

    /// Returns the instance as `Arc<T>` if it was registered with that concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let any = match self {
            Component::Service { any, .. } => any.as_ref()?,
            Component::Opaque { any, .. } => any,
        };
        Arc::clone(any).downcast::<T>().ok()
    }

    /// Type name captured at registration.
    pub fn type_name(&self) -> &'static str {
        match self {
            Component::Service { type_name, .. } | Component::Opaque { type_name, .. } => type_name,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_service() { "Service" } else { "Opaque" };
        f.debug_tuple(kind).field(&self.type_name()).finish()
    }
}
