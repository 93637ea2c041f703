//! Transport contract and its lifecycle events
//!
//! A transport owns one persistent connection and reports what happens to
//! it through an [`EventEmitter`]. Everything above the transport (the
//! JSON-RPC layer, the connection coordinator) reacts to those events by
//! subscribing listeners; nothing polls the transport for its state.
//!
//! # Events
//!
//! - **Connect**: a connection, initial or re-established, became usable
//! - **Disconnect**: the usable connection went away
//! - **Error**: any transport-level fault, payload optional
//! - **Message**: one inbound text frame
//!
//! # Unhandled Errors
//!
//! Emitting an `Error` event nobody listens for fails with
//! `Error::UnhandledTransportError`. Transports treat that as fatal for
//! their connection loop, so whoever owns a transport must decide what
//! transport faults mean by listening for them.
//!
//! # Examples
//!
//! ```rust
//! use steadyrpc_core::transport::{EventEmitter, EventKind, TransportEvent};
//!
//! let events = EventEmitter::new();
//! assert!(events.emit(TransportEvent::Error(None)).is_err());
//!
//! let id = events.on(EventKind::Error, |_| {});
//! assert_eq!(events.emit(TransportEvent::Error(None)).unwrap(), 1);
//!
//! events.off(id);
//! assert!(events.emit(TransportEvent::Error(None)).is_err());
//! ```

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Kinds of events a transport emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Connection established
    Connect,
    /// Connection lost
    Disconnect,
    /// Transport fault
    Error,
    /// Inbound text frame
    Message,
}

/// A transport lifecycle event
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection established
    Connect,
    /// Connection lost
    Disconnect,
    /// Transport fault; the payload may be absent
    Error(Option<Error>),
    /// Inbound text frame
    Message(String),
}

impl TransportEvent {
    /// The kind used to route this event to listeners
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Connect => EventKind::Connect,
            TransportEvent::Disconnect => EventKind::Disconnect,
            TransportEvent::Error(_) => EventKind::Error,
            TransportEvent::Message(_) => EventKind::Message,
        }
    }
}

/// Handle identifying one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callback type
pub type ListenerFn = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

struct Listener {
    id: ListenerId,
    kind: EventKind,
    callback: ListenerFn,
}

/// Listener registry for transport events
///
/// Listeners are synchronous and must not block; anything slow belongs on
/// a spawned task. They run outside the registry lock, so a listener may
/// itself register or remove listeners.
pub struct EventEmitter {
    listeners: RwLock<Vec<Listener>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener for one kind of event
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.push(Listener {
            id,
            kind,
            callback: Arc::new(listener),
        });
        id
    }

    /// Remove a listener; returns false if it was already gone
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Number of listeners registered for a kind
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Deliver an event to every listener of its kind, in registration order
    ///
    /// Returns how many listeners ran. An `Error` event with no listener
    /// fails with `Error::UnhandledTransportError`.
    pub fn emit(&self, event: TransportEvent) -> Result<usize> {
        let kind = event.kind();
        let callbacks: Vec<ListenerFn> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Arc::clone(&l.callback))
            .collect();

        if callbacks.is_empty() {
            if let TransportEvent::Error(payload) = event {
                let detail = payload
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no payload".to_string());
                return Err(Error::UnhandledTransportError(detail));
            }
            return Ok(0);
        }

        for callback in &callbacks {
            callback(&event);
        }
        Ok(callbacks.len())
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// A persistent-connection transport
///
/// `start` must be idempotent and must not wait for the connection: it
/// only kicks off connecting, and success is reported later through a
/// `Connect` event.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin connecting (and keep reconnecting, per the transport's policy)
    fn start(&self);

    /// Stop reconnecting and drop the connection
    fn stop(&self);

    /// The emitter this transport reports its lifecycle through
    fn events(&self) -> &EventEmitter;

    /// Send one text frame over the current connection
    async fn send(&self, text: String) -> Result<()>;
}
