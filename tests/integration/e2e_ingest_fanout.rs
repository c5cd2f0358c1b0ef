//! End-to-end: a real Gateway and a real Relay, each bound to an ephemeral
//! loopback port, wired together the way they'd run as separate processes —
//! POST an envelope to the Gateway, subscribe to the Relay's bus-out
//! WebSocket, and confirm the (pseudonymized, re-deflated) frame arrives.

use ed_protocol::codec::inflate;
use ed_protocol::topic::decode_frame;
use gateway::config::GatewayConfig;
use gateway::state::GatewayState;
use relay::config::RelayConfig;
use relay::state::RelayState;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;

const SCHEMA_REF: &str = "https://eddn.edcd.io/schemas/commodity/3";

async fn spawn_gateway() -> (SocketAddr, String) {
    let schema_dir = tempfile::tempdir().unwrap();
    let schema = json!({
        "id": SCHEMA_REF,
        "type": "object",
        "required": ["commodities"],
        "properties": { "commodities": { "type": "array" } }
    });
    std::fs::write(schema_dir.path().join("commodity-3.json"), schema.to_string()).unwrap();
    let schemas = ed_schema::SchemaRegistry::load_dir(schema_dir.path()).unwrap();

    let config = GatewayConfig {
        bind: "127.0.0.1:0".to_owned(),
        schema_dir: schema_dir.path().display().to_string(),
        max_body_bytes: 1024 * 1024,
        trusted_proxy_prefix: None,
        bus_capacity: 100,
        duplicate_window_minutes: 15,
        duplicate_max_entries: 1000,
    };
    let state = GatewayState::new(schemas, config);
    let app = gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    // Keep schema_dir alive for the lifetime of the test process.
    std::mem::forget(schema_dir);
    (addr, format!("http://{addr}/upload/"))
}

async fn spawn_relay(gateway_addr: SocketAddr) -> SocketAddr {
    let config = RelayConfig {
        bind: "127.0.0.1:0".to_owned(),
        upstreams: vec![format!("ws://{gateway_addr}/bus/v1/subscribe")],
        bus_capacity: 100,
        duplicate_window_minutes: 15,
        duplicate_max_entries: 1000,
        nonce_rotation_hours: 12,
        inlet_workers: 2,
    };
    let state = RelayState::new(config);
    tokio::spawn(relay::inlet::spawn(state.clone()));
    let app = relay::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn uploaded_envelope_is_rebroadcast_by_the_relay() {
    let (gateway_addr, upload_url) = spawn_gateway().await;
    let relay_addr = spawn_relay(gateway_addr).await;
    // Give the Relay's inlet task time to establish its upstream subscription.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut bus_client = ed_bus::bus_ws::connect(&format!("ws://{relay_addr}/bus/v1/subscribe"))
        .await
        .unwrap();

    let envelope = json!({
        "$schemaRef": SCHEMA_REF,
        "header": { "softwareName": "EDMC", "softwareVersion": "5.0.0", "uploaderID": "Cmdr-Jameson" },
        "message": { "commodities": [] }
    });
    let client = reqwest::Client::new();
    let response = client
        .post(&upload_url)
        .header("content-type", "application/json")
        .body(envelope.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        use tokio_stream::StreamExt;
        bus_client.next().await
    })
    .await
    .expect("relay should rebroadcast within 5s")
    .expect("relay bus stream should not end");

    let (topic, payload) = decode_frame(&frame);
    assert_eq!(topic, Some(SCHEMA_REF));
    let inflated = inflate(payload).unwrap();
    let received: Value = serde_json::from_slice(&inflated).unwrap();
    // Uploader ID must be pseudonymized, not the original commander name.
    let uploader = received["header"]["uploaderID"].as_str().unwrap();
    assert_ne!(uploader, "Cmdr-Jameson");
    assert_eq!(uploader.len(), 40);
    assert!(received["header"].get("uploaderIP").is_none());
}

#[tokio::test]
async fn duplicate_uploads_are_not_rebroadcast_twice() {
    let (gateway_addr, upload_url) = spawn_gateway().await;
    let relay_addr = spawn_relay(gateway_addr).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut bus_client = ed_bus::bus_ws::connect(&format!("ws://{relay_addr}/bus/v1/subscribe"))
        .await
        .unwrap();

    let envelope = json!({
        "$schemaRef": SCHEMA_REF,
        "header": { "softwareName": "EDMC", "softwareVersion": "5.0.0", "uploaderID": "Cmdr-Duplicate" },
        "message": { "commodities": [] }
    });
    let client = reqwest::Client::new();
    for _ in 0..2 {
        let response = client
            .post(&upload_url)
            .header("content-type", "application/json")
            .body(envelope.to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    use tokio_stream::StreamExt;
    let first = tokio::time::timeout(Duration::from_secs(5), bus_client.next())
        .await
        .expect("first publish should rebroadcast")
        .unwrap();
    decode_frame(&first);

    // A duplicate is suppressed at the Gateway already, so no second frame
    // should ever arrive.
    let second = tokio::time::timeout(Duration::from_millis(500), bus_client.next()).await;
    assert!(second.is_err(), "duplicate upload must not produce a second frame");
}
