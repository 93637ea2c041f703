//! Retrying commander
//!
//! `RetryCommander` is the default [`Commander`]. Every call runs on its
//! own task against the RPC layer. A call that fails with a retriable
//! error (see [`Error::is_retriable`]) is parked instead of failed, and
//! stays parked until someone calls [`Commander::trigger_retries`]. In a
//! full client that someone is the connection coordinator, shortly after
//! the transport reconnects.
//!
//! A call is always in exactly one place: in flight, parked, or resolved.
//! Triggering retries while a call is in flight does not duplicate it.

use crate::metrics::ClientMetrics;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use steadyrpc_core::{CallHandle, Commander, Error, Result, RpcLayer};
use tokio::sync::oneshot;

struct PendingCall {
    method: String,
    params: Option<Value>,
    attempts: u32,
    tx: oneshot::Sender<Result<Value>>,
}

/// Commander that parks retriable failures until retries are triggered
pub struct RetryCommander {
    dispatcher: Dispatcher,
}

#[derive(Clone)]
struct Dispatcher {
    rpc: Arc<dyn RpcLayer>,
    parked: Arc<Mutex<VecDeque<PendingCall>>>,
    max_attempts: Option<u32>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl RetryCommander {
    /// Commander over `rpc` that retries without limit
    pub fn new(rpc: Arc<dyn RpcLayer>) -> Self {
        Self {
            dispatcher: Dispatcher {
                rpc,
                parked: Arc::new(Mutex::new(VecDeque::new())),
                max_attempts: None,
                metrics: None,
            },
        }
    }

    /// Give up on a call after `attempts` tries in total
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.dispatcher.max_attempts = Some(attempts.max(1));
        self
    }

    /// Record parked calls
    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.dispatcher.metrics = Some(metrics);
        self
    }

    /// The RPC layer calls are sent through
    pub fn rpc(&self) -> &Arc<dyn RpcLayer> {
        &self.dispatcher.rpc
    }

    /// Number of calls waiting for a retry
    pub fn pending_retries(&self) -> usize {
        self.dispatcher.lock().len()
    }
}

impl Commander for RetryCommander {
    fn trigger_retries(&self) {
        let drained: Vec<PendingCall> = self.dispatcher.lock().drain(..).collect();
        if drained.is_empty() {
            return;
        }
        tracing::debug!(count = drained.len(), "Retrying parked calls");
        for call in drained {
            self.dispatcher.dispatch(call);
        }
    }

    fn call(&self, method: &str, params: Option<Value>) -> CallHandle {
        let (tx, handle) = CallHandle::channel();
        tracing::trace!(call = %handle.id(), method, "Call queued");
        self.dispatcher.dispatch(PendingCall {
            method: method.to_string(),
            params,
            attempts: 0,
            tx,
        });
        handle
    }
}

impl Dispatcher {
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingCall>> {
        self.parked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, call: PendingCall) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(self.clone().attempt(call));
            }
            Err(_) => {
                let _ = call.tx.send(Err(Error::Internal(
                    "Commander used outside a tokio runtime".to_string(),
                )));
            }
        }
    }

    async fn attempt(self, mut call: PendingCall) {
        if call.tx.is_closed() {
            tracing::debug!(method = %call.method, "Caller went away, dropping call");
            return;
        }

        call.attempts += 1;
        let result = self.rpc.request(&call.method, call.params.clone()).await;

        let error = match result {
            Err(e) if e.is_retriable() => e,
            other => {
                let _ = call.tx.send(other);
                return;
            }
        };

        if call.tx.is_closed() {
            return;
        }

        if let Some(max) = self.max_attempts {
            if call.attempts >= max {
                tracing::warn!(method = %call.method, attempts = call.attempts, error = %error, "Giving up on call");
                let _ = call.tx.send(Err(Error::RetriesExhausted {
                    method: call.method,
                    attempts: call.attempts,
                }));
                return;
            }
        }

        tracing::debug!(method = %call.method, attempts = call.attempts, error = %error, "Call parked for retry");
        if let Some(ref m) = self.metrics {
            m.record_call_parked(&call.method);
        }
        self.lock().push_back(call);
    }
}
