//! Error types for steadyrpc
//!
//! Two error shapes live here:
//!
//! - **Error**: the application-level error every steadyrpc operation returns
//! - **JsonRpcErrorData**: the JSON-RPC 2.0 wire error object carried in a
//!   response's `error` member
//!
//! # Retriable Errors
//!
//! The retrying commander only parks a call for a later retry when its
//! failure came from connectivity churn. `Error::is_retriable` draws that
//! line: transport faults are retriable. Everything the remote peer said
//! about the call itself is not, and neither is a timeout: the connection
//! may be perfectly healthy, so no reconnect would ever release the call.
//!
//! # Examples
//!
//! ```rust
//! use steadyrpc_core::{Error, JsonRpcErrorData};
//!
//! assert!(Error::ConnectionClosed.is_retriable());
//!
//! let remote = Error::JsonRpc(JsonRpcErrorData::method_not_found("compute"));
//! assert!(!remote.is_retriable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for steadyrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for steadyrpc operations
///
/// # Error Categories
///
/// - **Remote errors**: JsonRpc (the peer answered with an error object)
/// - **Transport errors**: WebSocket, Io, ConnectionClosed, NotConnected
/// - **Processing errors**: Serialization, InvalidRequest, Internal
/// - **Lifecycle errors**: Timeout, UnhandledTransportError, RetriesExhausted, Cancelled
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Error object returned by the remote peer
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcErrorData),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// WebSocket transport layer error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Input/output error
    #[error("IO error: {0}")]
    Io(String),

    /// Message that could not be understood as JSON-RPC 2.0
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Request operation timeout
    #[error("Request timeout")]
    Timeout,

    /// The connection dropped while the request was outstanding
    #[error("Connection closed")]
    ConnectionClosed,

    /// No connection is currently established
    #[error("Not connected")]
    NotConnected,

    /// A transport error event was emitted with no error listener attached
    ///
    /// Transports treat this as fatal for their connection loop, the same
    /// way an event emitter treats an `error` event nobody listens for.
    #[error("Unhandled transport error: {0}")]
    UnhandledTransportError(String),

    /// A call kept failing with retriable errors until its attempt limit
    #[error("Retries exhausted for '{method}' after {attempts} attempts")]
    RetriesExhausted {
        /// Method of the abandoned call
        method: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// The producer of an eventual result went away without resolving it
    #[error("Call cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the failure is caused by connectivity and worth retrying
    /// once the connection comes back
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed
                | Error::NotConnected
                | Error::WebSocket(_)
                | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// JSON-RPC 2.0 error object
///
/// The exact wire format found in the `error` member of a response.
/// `code` and `message` are mandatory, `data` is optional.
///
/// Reserved codes:
/// - `-32700`: Parse error
/// - `-32600`: Invalid Request
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000 to -32099`: Server error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code
    pub code: i32,
    /// Short description of the error
    pub message: String,
    /// Additional, peer-defined error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create an error object with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error object carrying extra data
    ///
    /// ```rust
    /// use steadyrpc_core::JsonRpcErrorData;
    /// use serde_json::json;
    ///
    /// let error = JsonRpcErrorData::with_data(1001, "Quota exceeded", json!({"limit": 10}));
    /// assert_eq!(error.data, Some(json!({"limit": 10})));
    /// ```
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Invalid request (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(-32600, msg)
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Invalid params (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(-32602, msg)
    }

    /// Internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(-32603, msg)
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}
