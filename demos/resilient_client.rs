//! Calls that survive server restarts
//!
//! Point this at any JSON-RPC 2.0 WebSocket server that implements `ping`.
//! Stop and restart the server while it runs: calls issued during the
//! outage are parked and resent a few seconds after the connection comes
//! back.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example resilient_client -- ws://127.0.0.1:9004
//! ```

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use steadyrpc::client::{ExponentialBackoff, SocketTransport};
use steadyrpc::{AppClient, ClientOptions, RetryJitter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9004".to_string());

    // Built by hand so its connection state can be printed
    let socket = Arc::new(SocketTransport::with_strategy(
        target.as_str(),
        Box::new(
            ExponentialBackoff::new(Duration::from_millis(250), Duration::from_secs(5))
                .with_jitter(),
        ),
    ));

    let client = AppClient::new(
        &target,
        ClientOptions::new()
            .with_transport(socket.clone())
            .with_retry_jitter(RetryJitter::new(Duration::from_secs(3))),
    );
    println!("Client started against {}", target);

    for i in 1..=u64::MAX {
        let started = tokio::time::Instant::now();
        match client.call("ping", Some(json!({"seq": i}))).await {
            Ok(response) => println!("[{}] {} after {:?}", i, response, started.elapsed()),
            Err(e) => println!("[{}] failed: {}", i, e),
        }
        println!("    transport state: {:?}", socket.state().await);

        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    client.close();
    Ok(())
}
