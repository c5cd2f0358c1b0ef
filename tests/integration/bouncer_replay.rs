//! End-to-end: a real Bouncer backed by a real durable journal, draining
//! into a recording stand-in upstream, confirming an upload survives a
//! POST -> disk -> replay round trip and the journal empties once the
//! drainer catches up.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use bouncer::config::BouncerConfig;
use bouncer::journal::Journal;
use bouncer::state::BouncerState;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorded {
    headers: HeaderMap,
    body: Vec<u8>,
}

#[derive(Clone)]
struct RecorderState {
    received: Arc<Mutex<Vec<Recorded>>>,
}

async fn record(State(state): State<RecorderState>, headers: HeaderMap, body: axum::body::Bytes) -> impl IntoResponse {
    state.received.lock().unwrap().push(Recorded {
        headers,
        body: body.to_vec(),
    });
    (StatusCode::OK, "OK")
}

async fn spawn_recorder() -> (std::net::SocketAddr, Arc<Mutex<Vec<Recorded>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = RecorderState { received: received.clone() };
    let app = Router::new()
        .route("/upload/", post(record))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}

async fn spawn_bouncer(upstream_addr: std::net::SocketAddr) -> (std::net::SocketAddr, BouncerState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::open(dir.path()).unwrap();
    let config = BouncerConfig {
        bind: "127.0.0.1:0".to_owned(),
        upstream_url: format!("http://{upstream_addr}/upload/"),
        queue_dir: dir.path().display().to_string(),
        max_body_bytes: 1024 * 1024,
        disk_watermark_bytes: 10 * 1024 * 1024,
        drain_backoff_max_seconds: 5,
        max_entry_age_days: 7,
    };
    let state = BouncerState::new(journal, config);
    let app = bouncer::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state, dir)
}

#[tokio::test]
async fn buffered_upload_is_drained_to_the_upstream_and_the_journal_empties() {
    let (upstream_addr, received) = spawn_recorder().await;
    let (bouncer_addr, state, _dir) = spawn_bouncer(upstream_addr).await;

    let body = serde_json::json!({
        "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
        "header": {"softwareName": "EDMC", "softwareVersion": "5.0.0", "uploaderID": "Cmdr-Jameson"},
        "message": {"commodities": []}
    })
    .to_string();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{bouncer_addr}/upload/"))
        .header("content-type", "application/json")
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(state.journal.len(), 1, "upload should be durably queued before any drain runs");

    tokio::spawn(bouncer::drainer::run(state.clone()));

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if state.journal.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "drainer should empty the journal within 5s");

    let recorded = received.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(String::from_utf8(recorded[0].body.clone()).unwrap(), body);
    assert_eq!(
        recorded[0].headers.get("content-type").unwrap().to_str().unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn uploads_survive_a_journal_reopen_before_any_drain() {
    let (upstream_addr, received) = spawn_recorder().await;
    let dir = tempfile::tempdir().unwrap();
    let config = BouncerConfig {
        bind: "127.0.0.1:0".to_owned(),
        upstream_url: format!("http://{upstream_addr}/upload/"),
        queue_dir: dir.path().display().to_string(),
        max_body_bytes: 1024 * 1024,
        disk_watermark_bytes: 10 * 1024 * 1024,
        drain_backoff_max_seconds: 5,
        max_entry_age_days: 7,
    };

    {
        let journal = Journal::open(dir.path()).unwrap();
        let state = BouncerState::new(journal, config.clone());
        let app = bouncer::build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{addr}/upload/"))
            .body("first process's upload")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        state.journal.flush_index().unwrap();
        server.abort();
    }

    // Simulate a restart: reopen the same queue directory in a fresh Journal.
    let journal = Journal::open(dir.path()).unwrap();
    assert_eq!(journal.len(), 1, "journal index should survive a restart");
    let state = BouncerState::new(journal, config);

    tokio::spawn(bouncer::drainer::run(state.clone()));
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if state.journal.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(drained.is_ok());

    let recorded = received.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].body, b"first process's upload");
}
