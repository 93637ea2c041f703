//! Core types and collaborator contracts for steadyrpc
//!
//! This crate holds everything the client layers agree on:
//!
//! - **Types**: JSON-RPC 2.0 requests, notifications, responses
//! - **Codec**: frame encoding and decoding
//! - **Error handling**: the shared error enum and its retriable classification
//! - **Contracts**: the `Transport`, `RpcLayer` and `Commander` traits that
//!   the `steadyrpc-client` facade wires together, plus the transport event
//!   emitter and the `CallHandle` eventual result
//! - **Observability**: OpenTelemetry and `tracing` bootstrap
//!
//! # Layering
//!
//! ```text
//! Transport  →  RpcLayer  →  Commander
//!  (events)     (requests)   (queue + retries)
//! ```
//!
//! Each layer only talks to the one below it through the trait, so any of
//! them can be swapped for a test double or another implementation.

pub mod codec;
pub mod commander;
pub mod error;
pub mod observability;
pub mod rpc;
pub mod transport;
pub mod types;

pub use commander::{CallHandle, CallId, Commander};
pub use error::{Error, JsonRpcErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use rpc::RpcLayer;
pub use transport::{EventEmitter, EventKind, ListenerId, Transport, TransportEvent};
pub use types::{Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
