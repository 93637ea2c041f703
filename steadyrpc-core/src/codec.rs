//! Encoding and decoding of JSON-RPC frames
//!
//! Every WebSocket text frame carries exactly one JSON value: a single
//! message or a batch array. Decoding maps malformed input onto the
//! standard JSON-RPC error objects so callers can report them uniformly.

use crate::error::{Error, JsonRpcErrorData, Result};
use crate::types::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest};
use serde::Serialize;

/// Encode any serializable message to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a request
pub fn encode_request(req: &JsonRpcRequest) -> Result<String> {
    encode(req)
}

/// Encode a notification
pub fn encode_notification(notif: &JsonRpcNotification) -> Result<String> {
    encode(notif)
}

/// Decode one text frame
///
/// Arrays become `JsonRpcMessage::Batch` with the raw items left for
/// [`decode_batch_item`]; an empty array is an invalid request.
///
/// ```rust
/// use steadyrpc_core::{codec, JsonRpcMessage};
///
/// let msg = codec::decode(r#"{"jsonrpc":"2.0","result":true,"id":1}"#).unwrap();
/// assert!(matches!(msg, JsonRpcMessage::Response(_)));
/// ```
pub fn decode(data: &str) -> Result<JsonRpcMessage> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|_| Error::JsonRpc(JsonRpcErrorData::parse_error()))?;

    match value {
        serde_json::Value::Array(items) if items.is_empty() => Err(Error::JsonRpc(
            JsonRpcErrorData::invalid_request("Batch cannot be empty"),
        )),
        serde_json::Value::Array(items) => Ok(JsonRpcMessage::Batch(items)),
        other => serde_json::from_value(other)
            .map_err(|e| Error::JsonRpc(JsonRpcErrorData::invalid_request(e.to_string()))),
    }
}

/// Decode one raw item of a batch
pub fn decode_batch_item(item: serde_json::Value) -> Result<JsonRpcMessage> {
    if item.is_array() {
        return Err(Error::JsonRpc(JsonRpcErrorData::invalid_request(
            "Nested batches are not allowed",
        )));
    }
    serde_json::from_value(item)
        .map_err(|e| Error::JsonRpc(JsonRpcErrorData::invalid_request(e.to_string())))
}
