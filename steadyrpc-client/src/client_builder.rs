//! Client builder for collaborator overrides and observability
//!
//! The `ClientBuilder` provides a fluent API over [`ClientOptions`]. On top
//! of the plain options it can:
//! - Initialize OpenTelemetry before the client starts
//! - Create the client metrics shared by every default collaborator
//! - Set the service name used for telemetry
//!
//! # Examples
//!
//! ```rust,no_run
//! use steadyrpc_client::{ClientBuilder, ExponentialBackoff, RetryJitter};
//! use std::time::Duration;
//!
//! # async fn example() -> steadyrpc_core::Result<()> {
//! // Faster reconnects and a tighter retry window
//! let client = ClientBuilder::new("ws://localhost:8080")
//!     .with_reconnect(Box::new(ExponentialBackoff::new(
//!         Duration::from_millis(50),
//!         Duration::from_secs(5),
//!     )))
//!     .with_retry_jitter(RetryJitter::new(Duration::from_secs(2)))
//!     .build()?;
//!
//! // With observability
//! let client2 = ClientBuilder::new("ws://localhost:8080")
//!     .with_default_observability()
//!     .service_name("billing-worker")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::client::{AppClient, ClientOptions};
use crate::jitter::RetryJitter;
use crate::metrics::ClientMetrics;
use crate::reconnect::ReconnectionStrategy;
use std::sync::Arc;
use steadyrpc_core::{Commander, Error, ObservabilityConfig, Result, RpcLayer, Transport};

/// Builder for configuring and creating an [`AppClient`]
pub struct ClientBuilder {
    target: String,
    options: ClientOptions,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            options: ClientOptions::default(),
            observability_config: None,
            service_name: None,
        }
    }

    /// Use a pre-built transport; the target is then ignored
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.options.transport = Some(transport);
        self
    }

    /// Use a pre-built RPC layer
    pub fn with_rpc(mut self, rpc: Arc<dyn RpcLayer>) -> Self {
        self.options.rpc = Some(rpc);
        self
    }

    /// Use a pre-built commander
    pub fn with_commander(mut self, commander: Arc<dyn Commander>) -> Self {
        self.options.commander = Some(commander);
        self
    }

    /// Reconnection strategy for the default transport
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.options.reconnect = Some(strategy);
        self
    }

    /// Delay window for retry triggers
    pub fn with_retry_jitter(mut self, jitter: RetryJitter) -> Self {
        self.options.retry_jitter = jitter;
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the client and start its transport
    pub fn build(self) -> Result<AppClient> {
        let mut options = self.options;

        if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            steadyrpc_core::init_observability(config.clone()).map_err(|e| {
                Error::Internal(format!("Failed to initialize observability: {}", e))
            })?;

            options.metrics = Some(Arc::new(ClientMetrics::new(config.service_name)));
        }

        Ok(AppClient::new(self.target, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::NoReconnect;
    use std::time::Duration;

    #[test]
    fn test_builder_collects_options() {
        let builder = ClientBuilder::new("ws://127.0.0.1:1")
            .with_reconnect(Box::new(NoReconnect))
            .with_retry_jitter(RetryJitter::new(Duration::from_secs(1)))
            .service_name("unit");

        assert_eq!(builder.target, "ws://127.0.0.1:1");
        assert!(builder.options.reconnect.is_some());
        assert_eq!(builder.options.retry_jitter.max(), Duration::from_secs(1));
        assert!(builder.observability_config.is_none());
        assert_eq!(builder.service_name.as_deref(), Some("unit"));
    }

    #[tokio::test]
    async fn test_build_without_observability() {
        let client = ClientBuilder::new("ws://127.0.0.1:1")
            .with_reconnect(Box::new(NoReconnect))
            .build()
            .unwrap();
        client.close();
    }
}
