//! Reconnection strategies for the socket transport
//!
//! When a connection attempt fails or an established connection drops, the
//! transport asks its strategy how long to wait before the next attempt,
//! or whether to give up.
//!
//! This policy is the transport's own. The retry jitter that decides when
//! queued calls are re-sent after a reconnect lives in
//! [`RetryJitter`](crate::RetryJitter) and is unrelated.
//!
//! # Built-in Strategies
//!
//! - **ExponentialBackoff**: doubling delays with a ceiling (the default)
//! - **FixedDelay**: the same delay every time
//! - **NoReconnect**: give up after the first failure
//!
//! ```rust
//! use steadyrpc_client::{ExponentialBackoff, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60))
//!     .with_max_attempts(5);
//! assert_eq!(backoff.next_delay(0), Some(Duration::from_secs(1)));
//! assert_eq!(backoff.next_delay(3), Some(Duration::from_secs(8)));
//! assert_eq!(backoff.next_delay(5), None);
//! ```

use rand::Rng;
use std::time::Duration;

/// Policy deciding the delay between connection attempts
///
/// `attempt` counts failed attempts since the last successful connection,
/// starting at 0. `reset` is called after every successful connection.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before the next attempt, or `None` to give up
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Forget accumulated state after a successful connection
    fn reset(&mut self);
}

/// Exponential backoff with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// Backoff from `min_delay` doubling up to `max_delay`, never giving up
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            max_attempts: None,
            jitter: false,
            current_attempt: 0,
        }
    }

    /// Give up after this many failed attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random extra delay to every attempt
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn base_delay_ms(&self, attempt: u32) -> u64 {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        min.saturating_mul(factor).min(max)
    }
}

impl Default for ExponentialBackoff {
    /// 100ms to 30s, unlimited attempts, with jitter
    ///
    /// A client is expected to outlive any single outage, so the default
    /// never gives up.
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30)).with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        self.current_attempt = attempt;

        if matches!(self.max_attempts, Some(max) if attempt >= max) {
            return None;
        }

        let delay = self.base_delay_ms(attempt);
        let extra = if self.jitter && delay >= 4 {
            rand::thread_rng().gen_range(0..=delay / 4)
        } else {
            0
        };

        Some(Duration::from_millis(delay + extra))
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Constant delay between attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Wait `delay` between attempts, never giving up
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after this many failed attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }

    fn reset(&mut self) {}
}

/// Never reconnect
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&mut self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}
}
