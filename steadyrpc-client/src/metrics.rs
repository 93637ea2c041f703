//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by the default collaborators and the
//! connection coordinator. They are exported through whatever meter
//! provider [`init_observability`](steadyrpc_core::init_observability)
//! installed; without one they are no-ops.
//!
//! # Metrics Collected
//!
//! - **connection.state**: current transport state (gauge)
//! - **reconnection.attempts** / **reconnection.success**: transport reconnects (counters)
//! - **retry_triggers.scheduled** / **retry_triggers.fired**: jittered retry triggers (counters)
//! - **calls.parked**: calls put aside for a later retry (counter)
//! - **requests.total** / **request.duration**: RPC requests (counter, histogram)
//! - **errors.total**: errors by type (counter)

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)
    pub connection_state: Gauge<i64>,
    /// Reconnection attempts made by the transport
    pub reconnection_attempts: Counter<u64>,
    /// Reconnections that succeeded
    pub reconnection_success: Counter<u64>,
    /// Retry triggers scheduled after a connect event
    pub retry_triggers_scheduled: Counter<u64>,
    /// Retry triggers whose delay elapsed
    pub retry_triggers_fired: Counter<u64>,
    /// Calls parked for a retry after a retriable failure
    pub calls_parked: Counter<u64>,
    /// RPC requests sent
    pub requests_total: Counter<u64>,
    /// RPC request duration in seconds
    pub request_duration: Histogram<f64>,
    /// Errors encountered
    pub errors_total: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        // The global meter API wants a 'static scope name; one leak per client
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("steadyrpc.client.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)")
                .build(),
            reconnection_attempts: meter
                .u64_counter("steadyrpc.client.reconnection.attempts")
                .with_description("Total number of reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("steadyrpc.client.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
            retry_triggers_scheduled: meter
                .u64_counter("steadyrpc.client.retry_triggers.scheduled")
                .with_description("Retry triggers scheduled after a connect event")
                .build(),
            retry_triggers_fired: meter
                .u64_counter("steadyrpc.client.retry_triggers.fired")
                .with_description("Retry triggers that fired")
                .build(),
            calls_parked: meter
                .u64_counter("steadyrpc.client.calls.parked")
                .with_description("Calls parked for retry after a retriable failure")
                .build(),
            requests_total: meter
                .u64_counter("steadyrpc.client.requests.total")
                .with_description("Total number of requests sent")
                .build(),
            request_duration: meter
                .f64_histogram("steadyrpc.client.request.duration")
                .with_description("Request duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("steadyrpc.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
        }
    }

    /// Update connection state
    pub fn update_connection_state(&self, state: i64) {
        self.connection_state.record(state, &[]);
    }

    /// Record a reconnection attempt
    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    /// Record a successful reconnection
    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    /// Record a retry trigger being scheduled
    pub fn record_retry_scheduled(&self, delay_ms: u64) {
        self.retry_triggers_scheduled
            .add(1, &[KeyValue::new("delay_ms", delay_ms as i64)]);
    }

    /// Record a retry trigger firing
    pub fn record_retry_fired(&self) {
        self.retry_triggers_fired.add(1, &[]);
    }

    /// Record a call parked for retry
    pub fn record_call_parked(&self, method: &str) {
        self.calls_parked
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    /// Record a request
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record_without_provider() {
        let metrics = ClientMetrics::new("test-client");

        metrics.update_connection_state(2);
        metrics.record_reconnection_attempt();
        metrics.record_reconnection_success();
        metrics.record_retry_scheduled(4_200);
        metrics.record_retry_fired();
        metrics.record_call_parked("orders.list");
        metrics.record_request("orders.list", "success", 0.02);
        metrics.record_error("websocket");
    }
}
