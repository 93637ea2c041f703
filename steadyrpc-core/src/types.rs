//! JSON-RPC 2.0 message types
//!
//! The client only ever sends requests and notifications, and mostly
//! receives responses. Servers may still push notifications or requests,
//! and may answer a batch with an array, so all shapes can be decoded.

use crate::error::JsonRpcErrorData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol version tag carried by every message
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request ID
///
/// Serialized untagged, so `Id::Number(1)` is `1` on the wire and
/// `Id::String("a")` is `"a"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Numeric identifier, what the client allocates
    Number(i64),
    /// Null identifier, used by peers that could not read the request id
    Null,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// A call that expects a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Remote method name
    pub method: String,
    /// Method parameters, omitted from the wire when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Correlation id
    pub id: Id,
}

impl JsonRpcRequest {
    /// Create a request
    ///
    /// ```rust
    /// use steadyrpc_core::{Id, JsonRpcRequest};
    ///
    /// let req = JsonRpcRequest::new("sum", Some(serde_json::json!([1, 2])), Id::Number(7));
    /// assert_eq!(req.jsonrpc, "2.0");
    /// ```
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A call that expects no response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Remote method name
    pub method: String,
    /// Method parameters, omitted from the wire when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    /// Create a notification
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// The answer to a request, either a result or an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Id of the request being answered
    pub id: Id,
}

impl JsonRpcResponse {
    /// Successful response
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Turn the response into the outcome of the call
    ///
    /// An error member wins over a result member. A response carrying
    /// neither resolves to `null`, which is what a `void` method returns
    /// when serialized by lenient peers.
    pub fn into_result(self) -> crate::Result<serde_json::Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(crate::Error::JsonRpc(error)),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

/// Any single JSON-RPC message, or a batch of raw items
///
/// Untagged: requests need `method` and `id`, notifications need `method`,
/// responses have no `method`. Variant order matters for that reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Incoming request
    Request(JsonRpcRequest),
    /// Incoming notification
    Notification(JsonRpcNotification),
    /// Response to one of our requests
    Response(JsonRpcResponse),
    /// Array of messages, decoded item by item
    Batch(Vec<serde_json::Value>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = JsonRpcRequest::new("ping", None, Id::Number(1));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "method": "ping", "id": 1}));
    }

    #[test]
    fn test_untagged_message_dispatch() {
        let req: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "a", "id": "x"})).unwrap();
        assert!(matches!(req, JsonRpcMessage::Request(_)));

        let notif: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "tick"})).unwrap();
        assert!(matches!(notif, JsonRpcMessage::Notification(_)));

        let resp: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "result": 3, "id": 4})).unwrap();
        assert!(matches!(resp, JsonRpcMessage::Response(_)));
    }

    #[test]
    fn test_into_result() {
        let ok = JsonRpcResponse::success(json!(8), Id::Number(1));
        assert_eq!(ok.into_result().unwrap(), json!(8));

        let err = JsonRpcResponse::error(JsonRpcErrorData::invalid_params("a"), Id::Number(2));
        assert!(matches!(err.into_result(), Err(crate::Error::JsonRpc(e)) if e.code == -32602));

        let empty = JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: None,
            id: Id::Number(3),
        };
        assert_eq!(empty.into_result().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(Id::from("abc").to_string(), "\"abc\"");
        assert_eq!(Id::from(5i64).to_string(), "5");
        assert_eq!(Id::Null.to_string(), "null");
    }
}
