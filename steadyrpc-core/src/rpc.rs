//! JSON-RPC layer contract
//!
//! The RPC layer sits on a [`Transport`](crate::transport::Transport),
//! encodes calls and correlates responses. A failed call surfaces the
//! error exactly as the layer produced it; deciding whether to retry is
//! the commander's job.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Method-call encoding and response correlation over a transport
#[async_trait]
pub trait RpcLayer: Send + Sync {
    /// Call a remote method and wait for its result
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value>;

    /// Send a notification; nothing comes back
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()>;
}
