//! Observability client example
//!
//! Demonstrates OpenTelemetry traces and client metrics, including the
//! retry trigger counters.
//!
//! Run with: cargo run --example observability_client

use serde::{Deserialize, Serialize};
use steadyrpc::core::ObservabilityConfig;
use steadyrpc::ClientBuilder;

#[derive(Serialize)]
struct AddParams {
    a: i32,
    b: i32,
}

#[derive(Deserialize)]
struct AddResult {
    sum: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let otel_config = ObservabilityConfig::new("steadyrpc-observability-client")
        .with_endpoint("http://localhost:4317")
        .with_log_level("debug");

    let client = ClientBuilder::new("ws://127.0.0.1:9010")
        .with_observability(otel_config)
        .service_name("observability-client")
        .build()?;

    println!("Client started; sending requests with distributed tracing...\n");

    for i in 1..=5 {
        tracing::info!(iteration = i, "Starting iteration");

        let params = serde_json::to_value(AddParams { a: i * 10, b: i * 5 })?;
        let result: AddResult = serde_json::from_value(client.call("add", Some(params)).await?)?;
        println!("Iteration {}: {} + {} = {}", i, i * 10, i * 5, result.sum);

        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
    }

    println!("\nAll requests completed!");
    println!("View traces at http://localhost:16686 (Jaeger UI)");

    // Give time for telemetry to flush
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    client.close();
    steadyrpc::core::shutdown_observability();

    Ok(())
}
