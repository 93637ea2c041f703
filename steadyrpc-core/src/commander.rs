//! Commander contract and the eventual-result handle
//!
//! A commander owns the queue of outstanding calls. Callers hand it a
//! method and parameters and immediately get a [`CallHandle`] back; the
//! call itself runs, fails, waits for a retry, and resolves on the
//! commander's schedule.

use crate::error::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Queue of outstanding calls that can re-send the ones waiting for a retry
pub trait Commander: Send + Sync {
    /// Re-send every call currently waiting for a retry
    fn trigger_retries(&self);

    /// Start a call and return its eventual result without waiting
    fn call(&self, method: &str, params: Option<Value>) -> CallHandle;
}

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        CallId(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

enum HandleState {
    Pending(oneshot::Receiver<Result<Value>>),
    Ready(Option<Result<Value>>),
}

/// Eventual result of a call
///
/// Await it to get the call's outcome. The [`CallId`] lets callers tell
/// handles apart without awaiting them. If the producing side is dropped
/// without resolving, the handle resolves to `Error::Cancelled`.
///
/// ```rust
/// use steadyrpc_core::commander::CallHandle;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let handle = CallHandle::ready(Ok(json!(42)));
/// assert_eq!(handle.await.unwrap(), json!(42));
/// # }
/// ```
pub struct CallHandle {
    id: CallId,
    state: HandleState,
}

impl CallHandle {
    /// Create a pending handle and the sender that resolves it
    pub fn channel() -> (oneshot::Sender<Result<Value>>, CallHandle) {
        let (tx, rx) = oneshot::channel();
        let handle = CallHandle {
            id: CallId::next(),
            state: HandleState::Pending(rx),
        };
        (tx, handle)
    }

    /// Create an already-resolved handle
    pub fn ready(result: Result<Value>) -> CallHandle {
        CallHandle {
            id: CallId::next(),
            state: HandleState::Ready(Some(result)),
        }
    }

    /// Identity of the call behind this handle
    pub fn id(&self) -> CallId {
        self.id
    }
}

impl std::fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle").field("id", &self.id).finish()
    }
}

impl Future for CallHandle {
    type Output = Result<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            HandleState::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Cancelled)),
                Poll::Pending => Poll::Pending,
            },
            HandleState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(Error::Cancelled)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_handle_resolves() {
        let (tx, handle) = CallHandle::channel();
        tx.send(Ok(json!("done"))).unwrap();
        assert_eq!(handle.await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_dropped_sender_cancels() {
        let (tx, handle) = CallHandle::channel();
        drop(tx);
        assert!(matches!(handle.await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_ready_handle_carries_error() {
        let handle = CallHandle::ready(Err(Error::Timeout));
        assert!(matches!(handle.await, Err(Error::Timeout)));
    }

    #[test]
    fn test_ids_are_unique() {
        let (_tx, a) = CallHandle::channel();
        let b = CallHandle::ready(Ok(Value::Null));
        assert_ne!(a.id(), b.id());
    }
}
