//! WebSocket transport with automatic reconnection
//!
//! `SocketTransport` is the default [`Transport`]: one WebSocket connection
//! to a fixed URL, kept alive by a supervisor task that reconnects according
//! to a [`ReconnectionStrategy`].
//!
//! # Supervisor Loop
//!
//! 1. Connect; on success emit `Connect`
//! 2. Emit every inbound text frame as `Message`
//! 3. When the stream ends emit `Disconnect`; read faults also emit `Error`
//! 4. Failed connection attempts emit `Error`
//! 5. Ask the strategy for a delay, sleep, go back to 1
//!
//! If an `Error` event finds no listener the supervisor stops for good,
//! like an event emitter with an unhandled `error`. Whoever owns the
//! transport is expected to listen for errors.
//!
//! `start()` must be called from within a tokio runtime.

use crate::connection_state::{ConnectionManager, ConnectionState};
use crate::metrics::ClientMetrics;
use crate::reconnect::{ExponentialBackoff, ReconnectionStrategy};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use steadyrpc_core::{Error, EventEmitter, Result, Transport, TransportEvent};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// How a connected session ended
enum SessionEnd {
    /// Peer closed or the stream ended
    Closed,
    /// `stop()` was called
    Shutdown,
    /// An error event went unhandled
    Fatal,
}

/// WebSocket transport
#[derive(Clone)]
pub struct SocketTransport {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    url: String,
    events: EventEmitter,
    sender: Mutex<Option<WsSink>>,
    connection: ConnectionManager,
    started: AtomicBool,
    shutdown: StdMutex<Option<watch::Sender<bool>>>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl SocketTransport {
    /// Transport for `url` with the default exponential backoff
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_strategy(url, Box::new(ExponentialBackoff::default()))
    }

    /// Transport for `url` with a custom reconnection strategy
    pub fn with_strategy(url: impl Into<String>, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self::with_metrics(url, strategy, None)
    }

    /// Transport that also records connection metrics
    pub fn with_metrics(
        url: impl Into<String>,
        strategy: Box<dyn ReconnectionStrategy>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                url: url.into(),
                events: EventEmitter::new(),
                sender: Mutex::new(None),
                connection: ConnectionManager::new(strategy),
                started: AtomicBool::new(false),
                shutdown: StdMutex::new(None),
                metrics,
            }),
        }
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.inner.connection.state().await
    }

    /// Whether `start` has been called and `stop` has not
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(url = %self.inner.url, error = %e, "Transport started outside a tokio runtime");
                self.inner.started.store(false, Ordering::SeqCst);
                return;
            }
        };

        let (tx, rx) = watch::channel(false);
        *self
            .inner
            .shutdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tx);

        runtime.spawn(Arc::clone(&self.inner).supervise(rx));
    }

    fn stop(&self) {
        let shutdown = self
            .inner
            .shutdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = shutdown {
            tracing::info!(url = %self.inner.url, "Stopping transport");
            let _ = tx.send(true);
        }
        self.inner.started.store(false, Ordering::SeqCst);
    }

    fn events(&self) -> &EventEmitter {
        &self.inner.events
    }

    async fn send(&self, text: String) -> Result<()> {
        let mut sender = self.inner.sender.lock().await;
        let sink = sender.as_mut().ok_or(Error::NotConnected)?;
        sink.send(Message::Text(text))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }
}

impl SocketInner {
    #[tracing::instrument(skip_all, fields(url = %self.url))]
    async fn supervise(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        self.connection.connecting().await;
        self.record_state().await;
        let mut has_connected = false;

        loop {
            let attempt = tokio::select! {
                _ = shutdown.changed() => break,
                attempt = connect_async(self.url.as_str()) => attempt,
            };

            match attempt {
                Ok((ws_stream, _)) => {
                    let (sink, mut stream) = ws_stream.split();
                    *self.sender.lock().await = Some(sink);
                    self.connection.connected().await;
                    self.record_state().await;
                    if has_connected {
                        if let Some(ref m) = self.metrics {
                            m.record_reconnection_success();
                        }
                    }
                    has_connected = true;

                    tracing::info!("Connected");
                    self.emit(TransportEvent::Connect);

                    let end = self.read_session(&mut stream, &mut shutdown).await;

                    if let Some(mut sink) = self.sender.lock().await.take() {
                        let _ = sink.close().await;
                    }
                    tracing::info!("Disconnected");
                    self.emit(TransportEvent::Disconnect);

                    match end {
                        SessionEnd::Closed => {}
                        SessionEnd::Shutdown => break,
                        SessionEnd::Fatal => return self.give_up().await,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Connection attempt failed");
                    if let Some(ref m) = self.metrics {
                        m.record_error("connect");
                    }
                    if !self.emit_error(Error::WebSocket(e.to_string())) {
                        return self.give_up().await;
                    }
                }
            }

            let Some(delay) = self.connection.next_reconnect_delay().await else {
                tracing::error!("Reconnection abandoned by strategy");
                return self.give_up().await;
            };
            self.record_state().await;
            if let Some(ref m) = self.metrics {
                m.record_reconnection_attempt();
            }
            tracing::info!(delay_secs = delay.as_secs_f64(), "Reconnecting");

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.connection.disconnected().await;
        self.record_state().await;
    }

    async fn read_session(
        &self,
        stream: &mut SplitStream<WsStream>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(bytes = text.len(), "Frame received");
                    self.emit(TransportEvent::Message(text));
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Connection closed by server");
                    return SessionEnd::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket read failed");
                    if let Some(ref m) = self.metrics {
                        m.record_error("websocket");
                    }
                    if !self.emit_error(Error::WebSocket(e.to_string())) {
                        return SessionEnd::Fatal;
                    }
                    return SessionEnd::Closed;
                }
            }
        }
    }

    fn emit(&self, event: TransportEvent) {
        // Only error events can fail to emit
        let _ = self.events.emit(event);
    }

    /// Emit an error event; false when nobody handled it
    fn emit_error(&self, error: Error) -> bool {
        match self.events.emit(TransportEvent::Error(Some(error))) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Transport error was not handled, stopping transport");
                false
            }
        }
    }

    async fn give_up(&self) {
        self.connection.failed().await;
        self.record_state().await;
        self.started.store(false, Ordering::SeqCst);
    }

    async fn record_state(&self) {
        if let Some(ref m) = self.metrics {
            m.update_connection_state(self.connection.state().await.as_metric());
        }
    }
}
