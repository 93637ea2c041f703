//! Request correlation for the JSON-RPC layer
//!
//! # Request Lifecycle
//!
//! 1. **Allocate**: take the next numeric id
//! 2. **Register**: park a oneshot sender under that id
//! 3. **Send**: the request goes out over the transport
//! 4. **Complete**: a response with the same id arrives and is forwarded
//!    through the oneshot; or the connection drops and every parked
//!    sender receives `ConnectionClosed`
//!
//! All operations are synchronous so transport listeners can complete
//! requests directly from the event callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use steadyrpc_core::{Error, Id, JsonRpcResponse, Result};
use tokio::sync::oneshot;

type ResponseSender = oneshot::Sender<Result<JsonRpcResponse>>;

/// Tracks requests that are waiting for a response
pub struct RequestManager {
    pending: Mutex<HashMap<Id, ResponseSender>>,
    next_id: AtomicI64,
}

impl RequestManager {
    /// Create an empty manager; ids start at 1
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Allocate a fresh request id
    pub fn next_id(&self) -> Id {
        Id::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Id, ResponseSender>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a request and get the receiver for its response
    pub fn register(&self, id: Id) -> oneshot::Receiver<Result<JsonRpcResponse>> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        rx
    }

    /// Deliver a response; returns false for unknown ids
    pub fn complete(&self, response: JsonRpcResponse) -> bool {
        match self.lock().remove(&response.id) {
            Some(tx) => {
                // The caller may have given up waiting
                let _ = tx.send(Ok(response));
                true
            }
            None => false,
        }
    }

    /// Forget a request without resolving it
    pub fn remove(&self, id: &Id) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Fail every pending request with the same error
    pub fn fail_all(&self, error: Error) -> usize {
        let drained: Vec<ResponseSender> = self.lock().drain().map(|(_, tx)| tx).collect();
        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Err(error.clone()));
        }
        count
    }

    /// Number of requests waiting for a response
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

impl Default for RequestManager {
    fn default() -> Self {
        Self::new()
    }
}
