//! steadyrpc - a JSON-RPC 2.0 client that survives reconnects
//!
//! This is the convenience crate that re-exports the steadyrpc sub-crates.
//! Use it if you want a single dependency.
//!
//! # Architecture
//!
//! - **steadyrpc-core**: protocol types, codec, errors, observability, and
//!   the `Transport` / `RpcLayer` / `Commander` contracts
//! - **steadyrpc-client**: default collaborators, the connection
//!   coordinator, and the `AppClient` facade
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use steadyrpc::{AppClient, ClientOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AppClient::new("ws://localhost:8080", ClientOptions::default());
//!
//!     let result = client.call("add", Some(json!({"a": 5, "b": 3}))).await?;
//!     println!("Result: {}", result);
//!
//!     Ok(())
//! }
//! ```

// Re-export the sub-crates under short names
pub use steadyrpc_client as client;
pub use steadyrpc_core as core;

// Most commonly used types
pub use steadyrpc_client::{AppClient, ClientBuilder, ClientOptions, RetryJitter};
pub use steadyrpc_core::{CallHandle, Commander, Error, Result, RpcLayer, Transport};
