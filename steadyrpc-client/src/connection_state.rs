//! Connection state tracking for the socket transport
//!
//! # Connection States
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                    ↓            ↓
//!                 Failed ← Reconnecting { attempt }
//! ```
//!
//! The transport supervisor drives the transitions. This layer only keeps
//! the state and the reconnection strategy together, so that the strategy
//! is reset exactly when a connection succeeds.
//!
//! Nothing above the transport reads this state to make decisions; the
//! coordinator reacts to events only. It is exposed for inspection and
//! metrics.

use crate::reconnect::ReconnectionStrategy;
use std::time::Duration;
use tokio::sync::RwLock;

/// Connection state of a socket transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Connected and usable
    Connected,
    /// Waiting before reconnection attempt number `attempt`
    Reconnecting { attempt: u32 },
    /// The reconnection strategy gave up
    Failed,
}

impl ConnectionState {
    /// Numeric code reported through the connection state gauge
    pub fn as_metric(&self) -> i64 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Failed => 4,
        }
    }
}

/// Owns the connection state and the reconnection strategy
pub struct ConnectionManager {
    state: RwLock<ConnectionState>,
    strategy: RwLock<Box<dyn ReconnectionStrategy>>,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state
    pub fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            strategy: RwLock::new(strategy),
        }
    }

    /// Current state
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    /// First attempt is starting
    pub async fn connecting(&self) {
        self.set_state(ConnectionState::Connecting).await;
    }

    /// A connection succeeded; the strategy starts over
    pub async fn connected(&self) {
        self.set_state(ConnectionState::Connected).await;
        self.strategy.write().await.reset();
    }

    /// The transport was stopped
    pub async fn disconnected(&self) {
        self.set_state(ConnectionState::Disconnected).await;
    }

    /// The transport gave up for good
    pub async fn failed(&self) {
        self.set_state(ConnectionState::Failed).await;
    }

    /// An attempt failed or the connection dropped
    ///
    /// Returns how long to wait before trying again and moves to
    /// `Reconnecting`, or moves to `Failed` and returns `None` when the
    /// strategy gives up.
    pub async fn next_reconnect_delay(&self) -> Option<Duration> {
        let attempt = match self.state().await {
            ConnectionState::Reconnecting { attempt } => attempt,
            _ => 0,
        };

        match self.strategy.write().await.next_delay(attempt) {
            Some(delay) => {
                self.set_state(ConnectionState::Reconnecting {
                    attempt: attempt.saturating_add(1),
                })
                .await;
                Some(delay)
            }
            None => {
                self.set_state(ConnectionState::Failed).await;
                None
            }
        }
    }
}
