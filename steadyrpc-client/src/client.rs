//! Application client facade
//!
//! `AppClient` assembles the collaborator chain
//!
//! ```text
//! Transport → RpcLayer → Commander
//! ```
//!
//! attaches a [`ConnectionCoordinator`] to the transport, and starts the
//! transport. Any layer can be supplied through [`ClientOptions`]; the ones
//! left out are built as defaults wrapping the layer below.
//!
//! # Client Lifecycle
//!
//! 1. **Construct**: wire the chain, attach the coordinator, start the
//!    transport. Construction never waits for the connection.
//! 2. **Use**: [`AppClient::call`] hands back a [`CallHandle`] right away.
//!    Calls that fail because the connection is down are retried after
//!    the next reconnect.
//! 3. **Close** (optional): [`AppClient::close`] detaches the coordinator
//!    and stops the transport. Dropping the client without closing leaves
//!    the transport running.
//!
//! # Retry Behaviour
//!
//! With the default commander, a call that fails because the connection
//! dropped is parked. Every connect event schedules one retry trigger after
//! a random delay drawn from [`ClientOptions::retry_jitter`] (up to 10s by
//! default), so a fleet of clients coming back from the same outage does
//! not resend everything at once. Errors reported by the server and
//! timeouts resolve the call straight away.
//!
//! # Transport Errors
//!
//! The coordinator subscribes a listener for transport error events that
//! does nothing. Without it the socket transport treats an error as
//! unhandled and stops reconnecting; with it, errors are only logged by the
//! transport itself.
//!
//! # Sharing
//!
//! `AppClient` is `Send + Sync`. It is not `Clone`: wrap it in an `Arc` to
//! use it from several tasks. The collaborators behind the accessors are
//! already `Arc`s and can be cloned out freely.
//!
//! # Examples
//!
//! ```rust,no_run
//! use steadyrpc_client::{AppClient, ClientOptions};
//! use serde_json::json;
//!
//! # async fn example() -> steadyrpc_core::Result<()> {
//! let client = AppClient::new("ws://localhost:8080", ClientOptions::default());
//! let total = client.call("sum", Some(json!([1, 2, 3]))).await?;
//! println!("{}", total);
//! # Ok(())
//! # }
//! ```

use crate::commander::RetryCommander;
use crate::coordinator::ConnectionCoordinator;
use crate::jitter::RetryJitter;
use crate::metrics::ClientMetrics;
use crate::reconnect::{ExponentialBackoff, ReconnectionStrategy};
use crate::rpc::JsonRpc;
use crate::socket::SocketTransport;
use serde_json::Value;
use std::sync::Arc;
use steadyrpc_core::{CallHandle, Commander, RpcLayer, Transport};

/// Overrides and settings for [`AppClient::new`]
///
/// Every field is optional. A layer left as `None` is built as a default
/// on top of the layer below it, so overriding only the transport still
/// gets a [`JsonRpc`] and a [`RetryCommander`] over it.
///
/// `reconnect` only applies to the default transport, and `metrics` only
/// to defaults and the coordinator. Supplied layers are used unchanged.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use steadyrpc_client::{AppClient, ClientOptions, FixedDelay, RetryJitter};
///
/// # async fn example() {
/// let options = ClientOptions::new()
///     .with_reconnect(Box::new(FixedDelay::new(Duration::from_secs(1))))
///     .with_retry_jitter(RetryJitter::new(Duration::from_secs(2)));
/// let client = AppClient::new("ws://localhost:8080", options);
/// # client.close();
/// # }
/// ```
#[derive(Default)]
pub struct ClientOptions {
    /// Use this transport instead of connecting to the target
    pub transport: Option<Arc<dyn Transport>>,
    /// Use this RPC layer instead of a [`JsonRpc`] over the transport
    pub rpc: Option<Arc<dyn RpcLayer>>,
    /// Use this commander instead of a [`RetryCommander`] over the RPC layer
    pub commander: Option<Arc<dyn Commander>>,
    /// Delay window for retry triggers after each connect
    pub retry_jitter: RetryJitter,
    /// Reconnection strategy for the default transport
    pub reconnect: Option<Box<dyn ReconnectionStrategy>>,
    /// Metrics shared by the default collaborators and the coordinator
    pub metrics: Option<Arc<ClientMetrics>>,
}

impl ClientOptions {
    /// Options that build every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing transport; `target` is then ignored
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use an existing RPC layer
    ///
    /// It should already be listening to the same transport.
    pub fn with_rpc(mut self, rpc: Arc<dyn RpcLayer>) -> Self {
        self.rpc = Some(rpc);
        self
    }

    /// Use an existing commander
    pub fn with_commander(mut self, commander: Arc<dyn Commander>) -> Self {
        self.commander = Some(commander);
        self
    }

    /// Bound the random delay before each retry trigger
    pub fn with_retry_jitter(mut self, jitter: RetryJitter) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// Reconnection strategy for the default transport
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect = Some(strategy);
        self
    }

    /// Record connection, retry and request metrics
    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Client facade over a transport, RPC layer and commander
///
/// Holds the three collaborators and the coordinator that links the
/// transport's connect events to the commander's retries. All calls go
/// through the commander.
pub struct AppClient {
    transport: Arc<dyn Transport>,
    rpc: Arc<dyn RpcLayer>,
    commander: Arc<dyn Commander>,
    coordinator: ConnectionCoordinator,
}

impl AppClient {
    /// Wire the collaborator chain and start the transport
    ///
    /// Defaults are built bottom up: transport, then RPC layer, then
    /// commander, each over the one before. The coordinator subscribes to
    /// the transport before it is started, so a connect that happens during
    /// `start` still schedules a retry trigger.
    ///
    /// `target` is only used when no transport is supplied. Must be called
    /// from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `target` - WebSocket URL for the default transport
    /// * `options` - Layer overrides and settings
    #[tracing::instrument(skip_all, fields(target = %target.as_ref()))]
    pub fn new(target: impl AsRef<str>, options: ClientOptions) -> Self {
        let ClientOptions {
            transport,
            rpc,
            commander,
            retry_jitter,
            reconnect,
            metrics,
        } = options;

        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => {
                let strategy = reconnect.unwrap_or_else(|| Box::new(ExponentialBackoff::default()));
                Arc::new(SocketTransport::with_metrics(
                    target.as_ref(),
                    strategy,
                    metrics.clone(),
                ))
            }
        };

        let rpc: Arc<dyn RpcLayer> = match rpc {
            Some(rpc) => rpc,
            None => {
                let mut layer = JsonRpc::new(Arc::clone(&transport));
                if let Some(ref m) = metrics {
                    layer = layer.with_metrics(Arc::clone(m));
                }
                Arc::new(layer)
            }
        };

        let commander: Arc<dyn Commander> = match commander {
            Some(commander) => commander,
            None => {
                let mut retrying = RetryCommander::new(Arc::clone(&rpc));
                if let Some(ref m) = metrics {
                    retrying = retrying.with_metrics(Arc::clone(m));
                }
                Arc::new(retrying)
            }
        };

        let coordinator = ConnectionCoordinator::attach(
            Arc::clone(&transport),
            Arc::clone(&commander),
            retry_jitter,
            metrics,
        );

        tracing::info!("Starting transport");
        transport.start();

        Self {
            transport,
            rpc,
            commander,
            coordinator,
        }
    }

    /// The transport in use
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The RPC layer in use
    pub fn rpc(&self) -> &Arc<dyn RpcLayer> {
        &self.rpc
    }

    /// The commander in use
    pub fn commander(&self) -> &Arc<dyn Commander> {
        &self.commander
    }

    /// Forward a call to the commander unchanged
    ///
    /// Returns the commander's own handle. It resolves once the call
    /// succeeds or fails for good; a call parked for retry stays pending
    /// across reconnects.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use steadyrpc_client::{AppClient, ClientOptions};
    /// # use serde_json::json;
    /// # async fn example(client: AppClient) -> steadyrpc_core::Result<()> {
    /// let handle = client.call("orders.get", Some(json!({"id": 7})));
    /// println!("waiting on {}", handle.id());
    /// let order = handle.await?;
    /// println!("{}", order);
    /// # Ok(())
    /// # }
    /// ```
    pub fn call(&self, method: &str, params: Option<Value>) -> CallHandle {
        self.commander.call(method, params)
    }

    /// Stop scheduling retries and stop the transport
    ///
    /// Retry triggers that were already scheduled still fire.
    pub fn close(&self) {
        tracing::info!("Closing client");
        self.coordinator.detach();
        self.transport.stop();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        !self.coordinator.is_attached()
    }
}
