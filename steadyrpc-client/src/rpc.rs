//! Default JSON-RPC layer
//!
//! `JsonRpc` turns method calls into JSON-RPC 2.0 frames on a
//! [`Transport`] and matches the responses coming back. It listens to two
//! transport events:
//!
//! - **Message**: decode the frame and complete the matching request
//! - **Disconnect**: fail every outstanding request with
//!   `Error::ConnectionClosed` right away, instead of leaving callers
//!   hanging on a connection that is gone. That error is retriable, so a
//!   retrying commander parks those calls until the next reconnect.

use crate::metrics::ClientMetrics;
use crate::request::RequestManager;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use steadyrpc_core::{
    codec, Error, EventKind, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, ListenerId,
    Result, RpcLayer, Transport, TransportEvent,
};

/// JSON-RPC 2.0 layer over a transport
pub struct JsonRpc {
    transport: Arc<dyn Transport>,
    requests: Arc<RequestManager>,
    timeout: Option<Duration>,
    metrics: Option<Arc<ClientMetrics>>,
    listeners: Vec<ListenerId>,
}

impl JsonRpc {
    /// Wrap a transport and subscribe to its message and disconnect events
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let requests = Arc::new(RequestManager::new());

        let on_message = {
            let requests = Arc::clone(&requests);
            transport.events().on(EventKind::Message, move |event| {
                if let TransportEvent::Message(text) = event {
                    handle_frame(&requests, text);
                }
            })
        };

        let on_disconnect = {
            let requests = Arc::clone(&requests);
            transport.events().on(EventKind::Disconnect, move |_| {
                let failed = requests.fail_all(Error::ConnectionClosed);
                if failed > 0 {
                    tracing::debug!(failed, "Connection dropped with requests outstanding");
                }
            })
        };

        Self {
            transport,
            requests,
            timeout: None,
            metrics: None,
            listeners: vec![on_message, on_disconnect],
        }
    }

    /// Fail requests that get no response within `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Record request metrics
    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The transport this layer sends over
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Requests currently waiting for a response
    pub fn pending_count(&self) -> usize {
        self.requests.pending_count()
    }

    /// Typed convenience over [`RpcLayer::request`]
    pub async fn request_as<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let result = self.request(method, Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    fn record(&self, method: &str, outcome: &Result<Value>, started: Instant) {
        if let Some(ref m) = self.metrics {
            let status = if outcome.is_ok() { "success" } else { "error" };
            m.record_request(method, status, started.elapsed().as_secs_f64());
            if let Err(e) = outcome {
                m.record_error(error_kind(e));
            }
        }
    }
}

#[async_trait]
impl RpcLayer for JsonRpc {
    #[tracing::instrument(skip_all, fields(method = %method))]
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let started = Instant::now();
        let id = self.requests.next_id();
        let text = codec::encode_request(&JsonRpcRequest::new(method, params, id.clone()))?;

        // Registered before sending so a fast response cannot be missed
        let rx = self.requests.register(id.clone());

        if let Err(e) = self.transport.send(text).await {
            self.requests.remove(&id);
            let outcome = Err(e);
            self.record(method, &outcome, started);
            return outcome;
        }

        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.requests.remove(&id);
                    let outcome = Err(Error::Timeout);
                    self.record(method, &outcome, started);
                    return outcome;
                }
            },
            None => rx.await,
        };

        let outcome = received
            .map_err(|_| Error::Internal("Request channel closed".to_string()))
            .and_then(|response| response)
            .and_then(|response| response.into_result());

        match &outcome {
            Ok(_) => tracing::debug!(id = %id, "Request completed"),
            Err(e) => tracing::debug!(id = %id, error = %e, "Request failed"),
        }
        self.record(method, &outcome, started);
        outcome
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let text = codec::encode_notification(&JsonRpcNotification::new(method, params))?;
        self.transport.send(text).await
    }
}

impl Drop for JsonRpc {
    fn drop(&mut self) {
        for id in self.listeners.drain(..) {
            self.transport.events().off(id);
        }
    }
}

fn handle_frame(requests: &RequestManager, text: &str) {
    let message = match codec::decode(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping undecodable frame");
            return;
        }
    };

    match message {
        JsonRpcMessage::Response(response) => complete(requests, response),
        JsonRpcMessage::Batch(items) => {
            tracing::debug!(batch_size = items.len(), "Batch received");
            for item in items {
                match codec::decode_batch_item(item) {
                    Ok(JsonRpcMessage::Response(response)) => complete(requests, response),
                    Ok(_) => tracing::debug!("Ignoring non-response batch item"),
                    Err(e) => tracing::warn!(error = %e, "Dropping undecodable batch item"),
                }
            }
        }
        JsonRpcMessage::Notification(notification) => {
            tracing::debug!(method = %notification.method, "Ignoring server notification");
        }
        JsonRpcMessage::Request(request) => {
            tracing::debug!(method = %request.method, "Ignoring server request");
        }
    }
}

fn complete(requests: &RequestManager, response: steadyrpc_core::JsonRpcResponse) {
    let id = response.id.clone();
    if !requests.complete(response) {
        tracing::debug!(id = %id, "Response for unknown request");
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::JsonRpc(_) => "json_rpc",
        Error::Timeout => "timeout",
        Error::ConnectionClosed | Error::NotConnected => "connection",
        Error::WebSocket(_) | Error::Io(_) => "transport",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use steadyrpc_core::{EventEmitter, Id, JsonRpcResponse};

    /// Transport that records frames and lets the test inject events
    #[derive(Default)]
    struct LoopbackTransport {
        events: EventEmitter,
        sent: Mutex<Vec<String>>,
        connected: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl Transport for LoopbackTransport {
        fn start(&self) {}
        fn stop(&self) {}
        fn events(&self) -> &EventEmitter {
            &self.events
        }
        async fn send(&self, text: String) -> Result<()> {
            if !self.connected.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Error::NotConnected);
            }
            self.sent.lock().unwrap().push(text);
            Ok(())
        }
    }

    fn connected_transport() -> Arc<LoopbackTransport> {
        let transport = Arc::new(LoopbackTransport::default());
        transport
            .connected
            .store(true, std::sync::atomic::Ordering::SeqCst);
        transport
    }

    async fn wait_for_frame(transport: &LoopbackTransport) -> JsonRpcRequest {
        loop {
            if let Some(text) = transport.sent.lock().unwrap().last().cloned() {
                return serde_json::from_str(&text).unwrap();
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_request_resolves_on_response() {
        let transport = connected_transport();
        let rpc = Arc::new(JsonRpc::new(transport.clone()));

        let task = {
            let rpc = Arc::clone(&rpc);
            tokio::spawn(async move { rpc.request("sum", Some(json!([2, 3]))).await })
        };

        let sent = wait_for_frame(&transport).await;
        assert_eq!(sent.method, "sum");
        assert_eq!(sent.params, Some(json!([2, 3])));

        let reply = serde_json::to_string(&JsonRpcResponse::success(json!(5), sent.id)).unwrap();
        transport
            .events
            .emit(TransportEvent::Message(reply))
            .unwrap();

        assert_eq!(task.await.unwrap().unwrap(), json!(5));
        assert_eq!(rpc.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_response_is_not_retriable() {
        let transport = connected_transport();
        let rpc = Arc::new(JsonRpc::new(transport.clone()));

        let task = {
            let rpc = Arc::clone(&rpc);
            tokio::spawn(async move { rpc.request("missing", None).await })
        };

        let sent = wait_for_frame(&transport).await;
        let reply = json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "Method not found"},
            "id": sent.id,
        });
        transport
            .events
            .emit(TransportEvent::Message(reply.to_string()))
            .unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::JsonRpc(ref e) if e.code == -32601));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending_with_retriable_error() {
        let transport = connected_transport();
        let rpc = Arc::new(JsonRpc::new(transport.clone()));

        let task = {
            let rpc = Arc::clone(&rpc);
            tokio::spawn(async move { rpc.request("slow", None).await })
        };
        wait_for_frame(&transport).await;

        transport.events.emit(TransportEvent::Disconnect).unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_send_failure_is_surfaced() {
        let transport = Arc::new(LoopbackTransport::default());
        let rpc = JsonRpc::new(transport);

        assert!(matches!(
            rpc.request("any", None).await,
            Err(Error::NotConnected)
        ));
        assert_eq!(rpc.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let transport = connected_transport();
        let rpc = JsonRpc::new(transport).with_timeout(Duration::from_secs(5));

        assert!(matches!(rpc.request("never", None).await, Err(Error::Timeout)));
        assert_eq!(rpc.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_responses_are_correlated() {
        let requests = RequestManager::new();
        let rx1 = requests.register(Id::Number(1));
        let rx2 = requests.register(Id::Number(2));

        handle_frame(
            &requests,
            r#"[{"jsonrpc":"2.0","result":"a","id":1},{"jsonrpc":"2.0","result":"b","id":2}]"#,
        );

        assert_eq!(rx1.await.unwrap().unwrap().result, Some(json!("a")));
        assert_eq!(rx2.await.unwrap().unwrap().result, Some(json!("b")));
    }

    #[test]
    fn test_garbage_frames_are_ignored() {
        let requests = RequestManager::new();
        handle_frame(&requests, "not json at all");
        handle_frame(&requests, r#"{"jsonrpc":"2.0","method":"server.push"}"#);
        assert_eq!(requests.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_sends_frame_without_id() {
        let transport = connected_transport();
        let rpc = JsonRpc::new(transport.clone());

        rpc.notify("log", Some(json!({"line": "hi"}))).await.unwrap();

        let sent = transport.sent.lock().unwrap()[0].clone();
        assert!(!sent.contains("\"id\""));
        assert!(sent.contains("\"method\":\"log\""));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let transport = connected_transport();
        let rpc = JsonRpc::new(transport.clone());
        assert_eq!(transport.events.listener_count(EventKind::Message), 1);
        drop(rpc);
        assert_eq!(transport.events.listener_count(EventKind::Message), 0);
        assert_eq!(transport.events.listener_count(EventKind::Disconnect), 0);
    }
}
