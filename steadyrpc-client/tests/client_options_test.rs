//! Collaborator injection and the call passthrough

mod common;

use common::{FakeCommander, FakeRpc, FakeTransport};
use serde_json::json;
use std::sync::Arc;
use steadyrpc_client::{AppClient, ClientBuilder, ClientOptions, JsonRpc, RetryCommander};
use steadyrpc_core::{Commander, EventKind, RpcLayer, Transport};

fn same<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[tokio::test]
async fn test_supplied_collaborators_are_exposed_unchanged() {
    let transport = FakeTransport::new();
    let rpc = FakeRpc::new();
    let commander = FakeCommander::new();

    let client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(transport.clone())
            .with_rpc(rpc.clone())
            .with_commander(commander.clone()),
    );

    assert!(same(client.transport(), &transport));
    assert!(same(client.rpc(), &rpc));
    assert!(same(client.commander(), &commander));

    // Accessors keep returning the same instances
    assert!(same(client.transport(), client.transport()));
    assert!(same(client.commander(), &commander));
}

#[tokio::test]
async fn test_supplied_transport_is_started_exactly_once() {
    let transport = FakeTransport::new();
    let _client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(transport.clone())
            .with_rpc(FakeRpc::new())
            .with_commander(FakeCommander::new()),
    );

    // Synchronously, before new() returned
    assert_eq!(transport.start_count(), 1);
}

#[tokio::test]
async fn test_coordinator_listens_before_start() {
    let transport = FakeTransport::new();
    let _client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(transport.clone())
            .with_commander(FakeCommander::new()),
    );

    assert_eq!(transport.events().listener_count(EventKind::Connect), 1);
    assert_eq!(transport.events().listener_count(EventKind::Error), 1);
}

#[tokio::test]
async fn test_default_rpc_wraps_supplied_transport() {
    let transport = FakeTransport::new();
    let commander = FakeCommander::new();
    let _client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(transport.clone())
            .with_commander(commander),
    );

    // The default JSON-RPC layer subscribed to the supplied transport
    assert_eq!(transport.events().listener_count(EventKind::Message), 1);
    assert_eq!(transport.events().listener_count(EventKind::Disconnect), 1);
}

#[tokio::test]
async fn test_default_commander_wraps_supplied_rpc() {
    let rpc = FakeRpc::new();
    let client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(FakeTransport::new())
            .with_rpc(rpc.clone()),
    );

    let result = client.call("whoami", None).await.unwrap();
    assert_eq!(result, json!("whoami"));
    assert_eq!(rpc.request_count(), 1);
}

#[tokio::test]
async fn test_call_is_forwarded_verbatim() {
    let commander = FakeCommander::new();
    let client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(FakeTransport::new())
            .with_rpc(FakeRpc::new())
            .with_commander(commander.clone()),
    );

    let params = json!({"user": 7, "fields": ["name", "email"]});
    let handle = client.call("users.get", Some(params.clone()));

    let calls = commander.calls();
    assert_eq!(calls.len(), 1);
    let (method, forwarded, id) = &calls[0];
    assert_eq!(method, "users.get");
    assert_eq!(forwarded, &Some(params));
    // The facade hands back the commander's own handle
    assert_eq!(*id, handle.id());

    commander.resolve_all(json!({"name": "Ada"}));
    assert_eq!(handle.await.unwrap(), json!({"name": "Ada"}));
}

#[tokio::test]
async fn test_call_without_params() {
    let commander = FakeCommander::new();
    let client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(FakeTransport::new())
            .with_commander(commander.clone()),
    );

    let _handle = client.call("ping", None);
    assert_eq!(commander.calls()[0].1, None);
}

#[tokio::test]
async fn test_hand_built_chain() {
    let transport = FakeTransport::new();
    let rpc: Arc<dyn RpcLayer> = Arc::new(JsonRpc::new(transport.clone()));
    let commander: Arc<dyn Commander> = Arc::new(RetryCommander::new(rpc.clone()));

    let client = AppClient::new(
        "ws://ignored",
        ClientOptions::new()
            .with_transport(transport.clone() as Arc<dyn Transport>)
            .with_rpc(rpc.clone())
            .with_commander(commander.clone()),
    );

    assert!(same(client.rpc(), &rpc));
    assert!(same(client.commander(), &commander));
    assert_eq!(transport.start_count(), 1);
}

#[tokio::test]
async fn test_builder_injects_collaborators() {
    let transport = FakeTransport::new();
    let commander = FakeCommander::new();

    let client = ClientBuilder::new("ws://ignored")
        .with_transport(transport.clone())
        .with_rpc(FakeRpc::new())
        .with_commander(commander.clone())
        .build()
        .unwrap();

    assert!(same(client.transport(), &transport));
    assert!(same(client.commander(), &commander));
    assert_eq!(transport.start_count(), 1);

    client.close();
    assert_eq!(transport.stop_count(), 1);
}
