//! # Service capability.
//!
//! A [`Service`] is any independently implemented unit the application brings up
//! and tears down: a connection pool, a cache warmer, a message consumer...
//! The common handle type is [`ServiceRef`], an `Arc<dyn Service>`.
//!
//! Services never manage their own idempotency; the application wraps each one in a
//! [`ManagedService`](crate::ManagedService) before calling it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ServiceError;

/// Stop budget used by [`Service::stop_default`].
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared reference to a service.
pub type ServiceRef = Arc<dyn Service>;

/// # Start/stop contract of a lifecycle-managed unit.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use appvisor::{Service, ServiceError};
///
/// struct Cache;
///
/// #[async_trait]
/// impl Service for Cache {
///     async fn start(&self) -> Result<(), ServiceError> {
///         // warm up...
///         Ok(())
///     }
///
///     async fn stop(&self, timeout: Duration) -> Result<(), ServiceError> {
///         // flush within `timeout`...
///         let _ = timeout;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Brings the service up. A returned error aborts application startup.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops the service, best effort within `timeout`.
    ///
    /// The budget is advisory for the implementation; the application enforces
    /// it anyway and reports [`ServiceError::Timeout`] when it is exceeded.
    async fn stop(&self, timeout: Duration) -> Result<(), ServiceError>;

    /// Stops the service with [`DEFAULT_STOP_TIMEOUT`].
    async fn stop_default(&self) -> Result<(), ServiceError> {
        self.stop(DEFAULT_STOP_TIMEOUT).await
    }
}
