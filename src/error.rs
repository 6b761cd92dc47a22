//! Error types used by the appvisor runtime, its services and listeners.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`]: errors returned by [`Application::start`](crate::Application::start)
//!   and [`Application::stop`](crate::Application::stop).
//! - [`ServiceError`]: errors raised by individual service start/stop calls.
//! - [`ListenerError`]: errors raised by the optional network listener.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! They are `Clone` so concurrent callers of `start()`/`stop()` can share one terminal result.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the appvisor runtime.
///
/// A batch of concurrent service calls surfaces exactly **one** representative
/// failure (the first observed); `failures` tells how many units of the batch failed.
/// Every individual failure is also published on the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// At least one managed service failed to start.
    #[error("service '{service}' failed to start: {error} ({failures} failure(s) in batch)")]
    ServiceStart {
        /// Registry key of the first failing service.
        service: String,
        /// The failure reported by that service.
        error: ServiceError,
        /// Number of failed units in the batch.
        failures: usize,
    },

    /// At least one managed service failed to stop (or exceeded its stop budget).
    #[error("service '{service}' failed to stop: {error} ({failures} failure(s) in batch)")]
    ServiceStop {
        /// Registry key of the first failing service.
        service: String,
        /// The failure reported by that service.
        error: ServiceError,
        /// Number of failed units in the batch.
        failures: usize,
    },

    /// The network listener failed to start or shut down.
    #[error("listener failure: {error}")]
    Listener {
        /// The underlying listener error.
        error: ListenerError,
    },

    /// A unit of work was submitted after the worker pool was shut down.
    #[error("worker pool is closed")]
    PoolClosed,

    /// The task running a start or stop sequence panicked or was aborted.
    #[error("lifecycle run interrupted: {info}")]
    Interrupted {
        /// Panic message or abort reason.
        info: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::{RuntimeError, ServiceError};
    ///
    /// let err = RuntimeError::ServiceStart {
    ///     service: "db".into(),
    ///     error: ServiceError::fail("refused"),
    ///     failures: 1,
    /// };
    /// assert_eq!(err.as_label(), "runtime_service_start");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ServiceStart { .. } => "runtime_service_start",
            RuntimeError::ServiceStop { .. } => "runtime_service_stop",
            RuntimeError::Listener { .. } => "runtime_listener",
            RuntimeError::PoolClosed => "runtime_pool_closed",
            RuntimeError::Interrupted { .. } => "runtime_interrupted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::ServiceStart {
                service,
                error,
                failures,
            } => format!("start failed: service={service} {} failures={failures}", error.as_message()),
            RuntimeError::ServiceStop {
                service,
                error,
                failures,
            } => format!("stop failed: service={service} {} failures={failures}", error.as_message()),
            RuntimeError::Listener { error } => format!("listener: {error}"),
            RuntimeError::PoolClosed => "worker pool closed".to_string(),
            RuntimeError::Interrupted { info } => format!("lifecycle run interrupted: {info}"),
        }
    }

    /// Registry key of the representative failing service, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            RuntimeError::ServiceStart { service, .. } | RuntimeError::ServiceStop { service, .. } => {
                Some(service)
            }
            _ => None,
        }
    }
}

impl From<ListenerError> for RuntimeError {
    fn from(error: ListenerError) -> Self {
        RuntimeError::Listener { error }
    }
}

/// # Errors produced by service start/stop calls.
///
/// Services return `Fail` themselves; the runtime produces the other variants
/// when a stop budget is exceeded, a unit is force-cancelled or a call panics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The call exceeded its timeout budget.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The call was cancelled by worker pool teardown.
    #[error("cancelled by worker pool shutdown")]
    Cancelled,

    /// The call panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ServiceError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::ServiceError;
    /// use std::time::Duration;
    ///
    /// let err = ServiceError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "service_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Timeout { .. } => "service_timeout",
            ServiceError::Cancelled => "service_cancelled",
            ServiceError::Panicked { .. } => "service_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::Fail { error } => format!("error: {error}"),
            ServiceError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ServiceError::Cancelled => "cancelled".to_string(),
            ServiceError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// # Errors produced by the network listener.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Binding the listening socket failed.
    #[error("failed to bind {addr}: {error}")]
    Bind {
        /// Requested address (`host:port`).
        addr: String,
        /// The underlying I/O error message.
        error: String,
    },

    /// Any other I/O failure.
    #[error("i/o error: {error}")]
    Io {
        /// The underlying I/O error message.
        error: String,
    },

    /// An operation that needs a running listener was called before `start()`.
    #[error("listener not started")]
    NotStarted,

    /// Shutdown did not complete within its budget.
    #[error("shutdown timed out after {timeout:?}")]
    ShutdownTimeout {
        /// The budget that was exceeded.
        timeout: Duration,
    },
}

impl ListenerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::Bind { .. } => "listener_bind",
            ListenerError::Io { .. } => "listener_io",
            ListenerError::NotStarted => "listener_not_started",
            ListenerError::ShutdownTimeout { .. } => "listener_shutdown_timeout",
        }
    }
}

impl From<std::io::Error> for ListenerError {
    fn from(err: std::io::Error) -> Self {
        ListenerError::Io {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_exposes_representative_service() {
        let err = RuntimeError::ServiceStop {
            service: "cache".into(),
            error: ServiceError::Timeout {
                timeout: Duration::from_secs(3),
            },
            failures: 2,
        };
        assert_eq!(err.service(), Some("cache"));
        assert_eq!(err.as_label(), "runtime_service_stop");
        assert!(err.to_string().contains("2 failure(s)"));
        assert!(RuntimeError::PoolClosed.service().is_none());
    }

    #[test]
    fn listener_error_converts_into_runtime_error() {
        let err: RuntimeError = ListenerError::NotStarted.into();
        assert_eq!(err.as_label(), "runtime_listener");
        assert_eq!(err.as_message(), "listener: listener not started");
    }

    #[test]
    fn io_error_converts_into_listener_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        let err = ListenerError::from(io);
        assert_eq!(err.as_label(), "listener_io");
        assert!(err.to_string().contains("taken"));
    }
}
