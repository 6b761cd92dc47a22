//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the application runtime.
//!
//! ## Sentinel values
//! - `pool_size = 0` → automatic (available parallelism + `pool_headroom`)
//! - `listener_grace = 0s` → wait for listener shutdown without a bound

use std::num::NonZeroUsize;
use std::time::Duration;

/// Global configuration for the application runtime.
///
/// ## Field semantics
/// - `stop_timeout`: budget handed to (and enforced on) each service's `stop`
/// - `pool_grace`: length of each of the two worker pool drain periods
/// - `listener_grace`: bound on listener shutdown before services stop (`0s` = unbounded)
/// - `pool_size`: worker pool permits (`0` = automatic)
/// - `pool_headroom`: permits added to available parallelism in automatic mode
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Per-service stop budget.
    ///
    /// A stop that exceeds it is reported as [`ServiceError::Timeout`](crate::ServiceError::Timeout)
    /// and counts as a failed stop.
    pub stop_timeout: Duration,

    /// Worker pool drain period.
    ///
    /// After all stop units are joined the pool is closed and given `pool_grace`
    /// to drain; outstanding work is then cancelled and given `pool_grace` again.
    pub pool_grace: Duration,

    /// Maximum wait for listener shutdown before services begin stopping.
    pub listener_grace: Duration,

    /// Number of concurrently running start/stop units.
    pub pool_size: usize,

    /// Extra permits on top of available parallelism when `pool_size = 0`.
    pub pool_headroom: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the effective worker pool size (always at least 1).
    #[inline]
    pub fn pool_size_resolved(&self) -> usize {
        if self.pool_size > 0 {
            return self.pool_size;
        }
        let cpus = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        cpus + self.pool_headroom
    }

    /// Returns the listener shutdown bound as an `Option`.
    #[inline]
    pub fn listener_timeout(&self) -> Option<Duration> {
        if self.listener_grace == Duration::ZERO {
            None
        } else {
            Some(self.listener_grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `stop_timeout = 30s`
    /// - `pool_grace = 15s`
    /// - `listener_grace = 10s`
    /// - `pool_size = 0` (automatic), `pool_headroom = 2`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(30),
            pool_grace: Duration::from_secs(15),
            listener_grace: Duration::from_secs(10),
            pool_size: 0,
            pool_headroom: 2,
            bus_capacity: 1024,
        }
    }
}
