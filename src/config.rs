//! # Pipeline configuration.
//!
//! [`Config`] centralizes the pipeline's knobs: visibility timeout, receive
//! batch size, long-poll wait, dispatcher concurrency ceiling, and
//! telemetry bus capacity.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use bigfan::Config;
//!
//! let mut cfg = Config::default();
//! cfg.visibility_timeout = Duration::from_secs(60);
//! cfg.max_concurrent = 4;
//!
//! assert_eq!(cfg.max_concurrent, 4);
//! ```

use std::time::Duration;

/// Global configuration for queues, dispatchers, and telemetry.
#[derive(Clone, Debug)]
pub struct Config {
    /// Lease duration applied to every received message.
    pub visibility_timeout: Duration,
    /// Maximum messages leased per receive call.
    pub batch_size: usize,
    /// Long-poll wait when a receive finds nothing visible.
    pub wait_time: Duration,
    /// Maximum concurrent handler invocations per dispatcher (0 = unlimited).
    pub max_concurrent: usize,
    /// Capacity of the telemetry bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `visibility_timeout = 300s`
    /// - `batch_size = 10`
    /// - `wait_time = 1s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(300),
            batch_size: 10,
            wait_time: Duration::from_secs(1),
            max_concurrent: 0,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.visibility_timeout, Duration::from_secs(300));
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.wait_time, Duration::from_secs(1));
        assert_eq!(cfg.max_concurrent, 0);
        assert_eq!(cfg.bus_capacity, 1024);
    }
}
