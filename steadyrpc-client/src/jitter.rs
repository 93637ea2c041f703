//! Retry trigger jitter
//!
//! When a shared outage ends, every client reconnects at roughly the same
//! moment. Delaying each client's retry trigger by a random amount spreads
//! the resent calls out instead of hitting the service all at once.

use rand::Rng;
use std::time::Duration;

/// Upper bound (exclusive) used by [`RetryJitter::default`]
pub const DEFAULT_RETRY_JITTER: Duration = Duration::from_millis(10_000);

/// Uniform random delay in `[0, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryJitter {
    max: Duration,
}

impl RetryJitter {
    /// Jitter with an exclusive upper bound of `max`
    pub fn new(max: Duration) -> Self {
        Self { max }
    }

    /// Jitter that never delays
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Exclusive upper bound
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay in whole milliseconds
    pub fn next_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

impl Default for RetryJitter {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_JITTER)
    }
}
