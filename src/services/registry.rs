//! # Ordered service registry.
//!
//! [`Registry`] maps string keys to [`Component`]s and preserves **first insertion
//! order**. Replacing an existing key keeps its position. The order matters: the
//! application starts services in registry order and submits their stops in reverse.
//!
//! ## Rules
//! - Lookups never fail for a missing key, they return `None`.
//! - Type-keyed entries use [`std::any::type_name`] as the key.
//! - Copies ([`Registry::copy_of`]) are decoupled from their source.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use appvisor::Registry;
//!
//! struct Settings { name: &'static str }
//!
//! let mut registry = Registry::new();
//! registry.put_typed(Arc::new(Settings { name: "demo" }));
//! registry.put_opaque("greeting", Arc::new(String::from("hello")));
//!
//! assert_eq!(registry.get_typed::<Settings>().unwrap().name, "demo");
//! assert_eq!(registry.get_as::<String>("greeting").unwrap().as_str(), "hello");
//! assert!(registry.get("missing").is_none());
//! ```

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::services::component::Component;
use crate::services::service::{Service, ServiceRef};

/// Insertion-ordered key → component store.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, Component>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`, returning the previous component.
    ///
    /// New keys are appended; replaced keys keep their position.
    pub fn put(&mut self, key: impl Into<String>, component: Component) -> Option<Component> {
        self.entries.insert(key.into(), component)
    }

    /// Registers a lifecycle-managed service under `key`.
    pub fn put_service<S: Service>(&mut self, key: impl Into<String>, service: Arc<S>) -> Option<Component> {
        self.put(key, Component::service(service))
    }

    /// Registers a type-erased service under `key`.
    pub fn put_service_ref(&mut self, key: impl Into<String>, service: ServiceRef) -> Option<Component> {
        self.put(key, Component::service_ref(service))
    }

    /// Registers a lifecycle-managed service keyed by its type name.
    pub fn put_service_typed<S: Service>(&mut self, service: Arc<S>) -> Option<Component> {
        self.put(type_key::<S>(), Component::service(service))
    }

    /// Registers an opaque object under `key`.
    pub fn put_opaque<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: Arc<T>) -> Option<Component> {
        self.put(key, Component::opaque(value))
    }

    /// Registers an opaque object keyed by its type name.
    pub fn put_typed<T: Any + Send + Sync>(&mut self, value: Arc<T>) -> Option<Component> {
        self.put(type_key::<T>(), Component::opaque(value))
    }

    /// Returns the component stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Component> {
        self.entries.get(key)
    }

    /// Returns the instance stored under `key` if it has concrete type `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key)?.downcast::<T>()
    }

    /// Returns the instance registered under `T`'s type name.
    pub fn get_typed<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_as::<T>(type_key::<T>())
    }

    /// True if `key` is registered.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates `(key, component)` pairs in insertion order.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = (&str, &Component)> + ExactSizeIterator {
        self.entries.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates lifecycle-managed entries in insertion order.
    pub fn services(&self) -> impl DoubleEndedIterator<Item = (&str, &ServiceRef)> {
        self.entries
            .iter()
            .filter_map(|(k, c)| c.as_service().map(|s| (k.as_str(), s)))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a new registry with the entries accepted by `filter`, in the same order.
    pub fn copy_of<F>(&self, mut filter: F) -> Registry
    where
        F: FnMut(&str, &Component) -> bool,
    {
        let entries = self
            .entries
            .iter()
            .filter(|(k, c)| filter(k, c))
            .map(|(k, c)| (k.clone(), c.clone()))
            .collect();
        Registry { entries }
    }

    /// Returns a copy holding only the lifecycle-managed entries.
    pub fn services_only(&self) -> Registry {
        self.copy_of(|_, c| c.is_service())
    }
}

impl<K: Into<String>> FromIterator<(K, Component)> for Registry {
    fn from_iter<I: IntoIterator<Item = (K, Component)>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for (key, component) in iter {
            registry.put(key, component);
        }
        registry
    }
}

/// Registry key used for type-keyed entries.
pub fn type_key<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}
