//! Reconnecting, retrying JSON-RPC 2.0 client over WebSocket
//!
//! This crate provides [`AppClient`], a facade over three collaborators:
//!
//! - a [`Transport`](steadyrpc_core::Transport) that owns the connection
//!   (default: [`SocketTransport`])
//! - an [`RpcLayer`](steadyrpc_core::RpcLayer) that encodes calls and
//!   correlates responses (default: [`JsonRpc`])
//! - a [`Commander`](steadyrpc_core::Commander) that queues calls and
//!   retries them on demand (default: [`RetryCommander`])
//!
//! # Core Features
//!
//! - **Retry on Reconnect**: every (re)connect schedules a retry of parked
//!   calls after a random delay, so a fleet of clients does not stampede
//!   the service after an outage
//! - **Error Suppression**: transport faults never reach callers; the
//!   transport keeps reconnecting on its own
//! - **Injection**: any layer can be replaced, e.g. with a test double
//! - **Observability**: OpenTelemetry integration for traces and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use steadyrpc_client::{AppClient, ClientOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AppClient::new("ws://localhost:8080", ClientOptions::default());
//!
//!     // Resolves once the server answers, even across reconnects
//!     let result = client.call("ping", None).await?;
//!     println!("Result: {}", result);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Custom Collaborators
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use steadyrpc_client::{AppClient, ClientOptions, JsonRpc, RetryCommander, SocketTransport};
//!
//! # async fn example() {
//! let transport = Arc::new(SocketTransport::new("ws://localhost:8080"));
//! let rpc = Arc::new(JsonRpc::new(transport.clone()).with_timeout(Duration::from_secs(5)));
//! let commander = Arc::new(RetryCommander::new(rpc.clone()).with_max_attempts(5));
//!
//! let client = AppClient::new(
//!     "ignored",
//!     ClientOptions::new()
//!         .with_transport(transport)
//!         .with_rpc(rpc)
//!         .with_commander(commander),
//! );
//! # }
//! ```

mod client;
mod client_builder;
mod commander;
mod connection_state;
mod coordinator;
mod jitter;
mod metrics;
mod reconnect;
mod request;
mod rpc;
mod socket;

pub use client::{AppClient, ClientOptions};
pub use client_builder::ClientBuilder;
pub use commander::RetryCommander;
pub use connection_state::{ConnectionManager, ConnectionState};
pub use coordinator::ConnectionCoordinator;
pub use jitter::{RetryJitter, DEFAULT_RETRY_JITTER};
pub use metrics::ClientMetrics;
pub use reconnect::{ExponentialBackoff, FixedDelay, NoReconnect, ReconnectionStrategy};
pub use request::RequestManager;
pub use rpc::JsonRpc;
pub use socket::SocketTransport;
