//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps two closures: `S: Fn() -> Fut` for start and
//! `T: Fn(Duration) -> Fut` for stop, producing a fresh future per call.
//! If shared state is needed between the two, capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{ServiceError, ServiceFn};
//!
//! let svc = ServiceFn::arc(
//!     || async { Ok::<_, ServiceError>(()) },
//!     |_timeout: Duration| async { Ok::<_, ServiceError>(()) },
//! );
//! # let _ = svc;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::services::service::Service;

/// Function-backed service implementation.
pub struct ServiceFn<S, T> {
    start: S,
    stop: T,
}

impl<S, T> ServiceFn<S, T> {
    /// Creates a new function-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when registering right away.
    pub fn new(start: S, stop: T) -> Self {
        Self { start, stop }
    }

    /// Creates the service and returns it behind an `Arc`.
    pub fn arc(start: S, stop: T) -> Arc<Self> {
        Arc::new(Self::new(start, stop))
    }
}

#[async_trait]
impl<S, SF, T, TF> Service for ServiceFn<S, T>
where
    S: Fn() -> SF + Send + Sync + 'static,
    SF: Future<Output = Result<(), ServiceError>> + Send + 'static,
    T: Fn(Duration) -> TF + Send + Sync + 'static,
    TF: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    async fn start(&self) -> Result<(), ServiceError> {
        (self.start)().await
    }

    async fn stop(&self, timeout: Duration) -> Result<(), ServiceError> {
        (self.stop)(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::DEFAULT_STOP_TIMEOUT;
    use std::sync::Mutex;

    #[tokio::test]
    async fn closures_receive_calls_and_timeout() {
        let seen = Arc::new(Mutex::new(Vec::<Duration>::new()));
        let rec = Arc::clone(&seen);
        let svc = ServiceFn::new(
            || async { Err::<(), _>(ServiceError::fail("nope")) },
            move |timeout: Duration| {
                let rec = Arc::clone(&rec);
                async move {
                    rec.lock().unwrap().push(timeout);
                    Ok::<_, ServiceError>(())
                }
            },
        );

        assert_eq!(svc.start().await, Err(ServiceError::fail("nope")));
        svc.stop(Duration::from_millis(5)).await.unwrap();
        svc.stop_default().await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Duration::from_millis(5), DEFAULT_STOP_TIMEOUT]
        );
    }
}
