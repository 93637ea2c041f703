//! Connection lifecycle coordination
//!
//! The coordinator links a transport's lifecycle events to a commander:
//!
//! - **Connect**: schedule one retry trigger after a jittered delay. Every
//!   connect schedules its own trigger; overlapping triggers are neither
//!   merged nor cancelled.
//! - **Error**: swallowed. Having a listener at all is what matters, since
//!   an error event nobody listens to is fatal to the transport. Reconnecting
//!   is left to the transport's own strategy.
//!
//! The coordinator keeps no connection state of its own.

use crate::jitter::RetryJitter;
use crate::metrics::ClientMetrics;
use std::sync::{Arc, Mutex};
use steadyrpc_core::{Commander, EventKind, ListenerId, Transport, TransportEvent};
use tokio::runtime::Handle;

/// Subscription of retry scheduling and error suppression on a transport
pub struct ConnectionCoordinator {
    transport: Arc<dyn Transport>,
    listeners: Mutex<Vec<ListenerId>>,
}

impl ConnectionCoordinator {
    /// Register the connect and error listeners on `transport`
    ///
    /// Retry triggers are spawned on the runtime that is current here, so
    /// the transport may emit from any thread.
    pub fn attach(
        transport: Arc<dyn Transport>,
        commander: Arc<dyn Commander>,
        jitter: RetryJitter,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        let runtime = Handle::try_current().ok();

        let on_connect = transport.events().on(EventKind::Connect, move |_| {
            schedule_retry(runtime.as_ref(), &commander, jitter, metrics.as_ref());
        });

        let on_error = transport
            .events()
            .on(EventKind::Error, |_event: &TransportEvent| {});

        Self {
            transport,
            listeners: Mutex::new(vec![on_connect, on_error]),
        }
    }

    /// Remove both listeners
    ///
    /// Triggers that were already scheduled still fire. Calling this more
    /// than once is harmless.
    pub fn detach(&self) {
        let listeners: Vec<ListenerId> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        if listeners.is_empty() {
            return;
        }
        for id in listeners {
            self.transport.events().off(id);
        }
        tracing::debug!("Connection coordinator detached");
    }

    /// Whether the listeners are still registered
    pub fn is_attached(&self) -> bool {
        !self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

fn schedule_retry(
    runtime: Option<&Handle>,
    commander: &Arc<dyn Commander>,
    jitter: RetryJitter,
    metrics: Option<&Arc<ClientMetrics>>,
) {
    let runtime = match runtime.cloned().or_else(|| Handle::try_current().ok()) {
        Some(runtime) => runtime,
        None => {
            tracing::warn!("No tokio runtime to schedule retry trigger on");
            return;
        }
    };

    let delay = jitter.next_delay();
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    tracing::debug!(delay_ms, "Connected, scheduling retry trigger");
    if let Some(m) = metrics {
        m.record_retry_scheduled(delay_ms);
    }

    let deadline = tokio::time::Instant::now() + delay;
    let commander = Arc::clone(commander);
    let metrics = metrics.cloned();
    runtime.spawn(async move {
        tokio::time::sleep_until(deadline).await;
        if let Some(m) = metrics {
            m.record_retry_fired();
        }
        commander.trigger_retries();
    });
}
