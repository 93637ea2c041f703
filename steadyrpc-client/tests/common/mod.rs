//! Common test utilities for steadyrpc-client integration tests
//!
//! This module provides fake collaborators for driving the facade by hand,
//! and a mock WebSocket server for testing the default collaborators
//! without a real service.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use steadyrpc_core::{
    CallHandle, CallId, Commander, Error, EventEmitter, Result, RpcLayer, Transport,
    TransportEvent,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Transport whose events are emitted by the test
#[derive(Default)]
pub struct FakeTransport {
    events: EventEmitter,
    starts: AtomicUsize,
    stops: AtomicUsize,
    connect_on_start: bool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport that emits `Connect` from inside `start()`
    pub fn connecting_on_start() -> Arc<Self> {
        Arc::new(Self {
            connect_on_start: true,
            ..Self::default()
        })
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn emit_connect(&self) {
        self.events.emit(TransportEvent::Connect).unwrap();
    }

    pub fn emit_error(&self, error: Option<Error>) -> Result<usize> {
        self.events.emit(TransportEvent::Error(error))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.connect_on_start {
            self.emit_connect();
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn events(&self) -> &EventEmitter {
        &self.events
    }

    async fn send(&self, _text: String) -> Result<()> {
        Err(Error::NotConnected)
    }
}

/// Commander that records what it was asked to do
#[derive(Default)]
pub struct FakeCommander {
    triggers: AtomicUsize,
    calls: Mutex<Vec<(String, Option<Value>, CallId)>>,
    senders: Mutex<Vec<oneshot::Sender<Result<Value>>>>,
}

impl FakeCommander {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Option<Value>, CallId)> {
        self.calls.lock().unwrap().clone()
    }

    /// Resolve every handle handed out so far
    pub fn resolve_all(&self, value: Value) {
        for tx in self.senders.lock().unwrap().drain(..) {
            let _ = tx.send(Ok(value.clone()));
        }
    }
}

impl Commander for FakeCommander {
    fn trigger_retries(&self) {
        self.triggers.fetch_add(1, Ordering::SeqCst);
    }

    fn call(&self, method: &str, params: Option<Value>) -> CallHandle {
        let (tx, handle) = CallHandle::channel();
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params, handle.id()));
        self.senders.lock().unwrap().push(tx);
        handle
    }
}

/// RPC layer that answers every request with its method name
#[derive(Default)]
pub struct FakeRpc {
    requests: AtomicUsize,
}

impl FakeRpc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcLayer for FakeRpc {
    async fn request(&self, method: &str, _params: Option<Value>) -> Result<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(Value::String(method.to_string()))
    }

    async fn notify(&self, _method: &str, _params: Option<Value>) -> Result<()> {
        Ok(())
    }
}

/// What the mock server does with one inbound frame
pub enum Reply {
    /// Send this text back
    Text(String),
    /// Say nothing
    Silent,
    /// Close this connection
    Close,
}

/// Mock WebSocket server for client testing
///
/// Accepts any number of connections and feeds every inbound text frame
/// to a handler. Connections can be dropped from the test to force the
/// client to reconnect.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    kick_tx: broadcast::Sender<()>,
    connections: Arc<AtomicUsize>,
    message_rx: mpsc::Receiver<String>,
}

impl MockWsServer {
    /// Start a server that answers every request with its params
    pub async fn new() -> Self {
        Self::with_handler(|text| async move { echo_params(&text) }).await
    }

    /// Start a server with a custom frame handler
    pub async fn with_handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, msg_rx) = mpsc::channel::<String>(100);
        let (kick_tx, _) = broadcast::channel::<()>(8);
        let connections = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(handler);

        {
            let kick_tx = kick_tx.clone();
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        accepted = listener.accept() => {
                            let Ok((stream, _)) = accepted else { continue };
                            connections.fetch_add(1, Ordering::SeqCst);
                            let msg_tx = msg_tx.clone();
                            let handler = Arc::clone(&handler);
                            let mut kick_rx = kick_tx.subscribe();

                            tokio::spawn(async move {
                                let Ok(ws_stream) = accept_async(stream).await else { return };
                                let (mut write, mut read) = ws_stream.split();

                                loop {
                                    let frame = tokio::select! {
                                        _ = kick_rx.recv() => break,
                                        frame = read.next() => frame,
                                    };
                                    let text = match frame {
                                        Some(Ok(Message::Text(text))) => text,
                                        Some(Ok(_)) => continue,
                                        _ => break,
                                    };
                                    let _ = msg_tx.send(text.clone()).await;
                                    match handler(text).await {
                                        Reply::Text(reply) => {
                                            let _ = write.send(Message::Text(reply)).await;
                                        }
                                        Reply::Silent => {}
                                        Reply::Close => break,
                                    }
                                }
                                let _ = write.close().await;
                            });
                        }
                    }
                }
            });
        }

        Self {
            addr,
            shutdown_tx,
            kick_tx,
            connections,
            message_rx: msg_rx,
        }
    }

    /// WebSocket URL of this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Drop every open connection; the server keeps listening
    pub fn kick_all(&self) {
        let _ = self.kick_tx.send(());
    }

    /// Next frame received from any client, within five seconds
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting connections
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        self.kick_all();
    }
}

/// Reply to a request with its own params as the result
pub fn echo_params(text: &str) -> Reply {
    let request: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return Reply::Silent,
    };
    match request.get("id") {
        Some(id) => Reply::Text(mock_response(
            id.clone(),
            request.get("params").cloned().unwrap_or(Value::Null),
        )),
        None => Reply::Silent,
    }
}

/// Helper to create a mock JSON-RPC response
pub fn mock_response(id: Value, result: Value) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id
    })
    .to_string()
}

/// Helper to create a mock JSON-RPC error response
pub fn mock_error_response(id: Value, code: i32, message: &str) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message
        },
        "id": id
    })
    .to_string()
}

/// Poll `condition` every few milliseconds until it holds or five seconds pass
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
