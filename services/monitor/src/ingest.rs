//! Bus consumption for the Monitor: subscribes to the upstream bus with no
//! topic filter, classifies each frame, and upserts its schema/software hit
//! counts into Postgres.
//!
//! Grounded on the Relay's `inlet.rs` bounded-queue/fixed-worker-pool shape
//! (REDESIGN FLAGS: greenlet-per-message -> bounded `mpsc` + fixed pool),
//! with the transform/pseudonymization step dropped: the Monitor only reads
//! and tallies, it never re-publishes.

use crate::repo::stats;
use crate::state::MonitorState;
use chrono::Utc;
use ed_bus::Frame;
use ed_dedupe::Observation;
use ed_protocol::{codec, topic, Envelope, Fingerprint};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

const QUEUE_CAPACITY: usize = 1024;
const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

const DUPLICATE_SCHEMA_NAME: &str = "DUPLICATE MESSAGE";

pub async fn spawn(state: MonitorState) {
    let (tx, rx) = mpsc::channel::<Frame>(QUEUE_CAPACITY);
    let upstream = state.config.upstream.clone();
    tokio::spawn(connect_upstream(upstream, tx));

    let queue = Arc::new(Mutex::new(rx));
    let worker_count = state.config.ingest_workers.max(1);
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let queue = queue.clone();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let frame = queue.lock().await.recv().await;
                match frame {
                    Some(frame) => process_frame(&state, frame).await,
                    None => break,
                }
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

async fn process_frame(state: &MonitorState, frame: Frame) {
    let (_topic, payload) = topic::decode_frame(&frame);

    let inflated = match codec::inflate(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "dropping corrupt monitor frame");
            return;
        }
    };

    let value = match Envelope::parse_json(&inflated) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "dropping unparseable monitor frame");
            return;
        }
    };
    let envelope = match Envelope::from_value(value) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "dropping malformed monitor envelope");
            return;
        }
    };

    let today = Utc::now().date_naive();
    if is_duplicate(state, &envelope) {
        if let Err(e) = stats::bump_schema_hit(&state.pool, DUPLICATE_SCHEMA_NAME, today).await {
            error!(error = %e, "failed to record duplicate hit");
        }
        return;
    }

    if let Err(e) = stats::bump_schema_hit(&state.pool, &envelope.schema_ref, today).await {
        error!(error = %e, "failed to record schema hit");
    }

    let software_name = format!(
        "{} | {}",
        envelope.header.software_name, envelope.header.software_version
    );
    if let Err(e) = stats::bump_software_hit(&state.pool, &software_name, today).await {
        error!(error = %e, "failed to record software hit");
    }
}

fn is_duplicate(state: &MonitorState, envelope: &Envelope) -> bool {
    matches!(state.dedupe.observe(Fingerprint::of(envelope)), Observation::Duplicate)
}

async fn connect_upstream(url: String, tx: mpsc::Sender<Frame>) {
    loop {
        info!(%url, "connecting to upstream bus");
        match ed_bus::bus_ws::connect(&url).await {
            Ok(mut stream) => {
                info!(%url, "connected to upstream bus");
                while let Some(frame) = stream.next().await {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                warn!(%url, "upstream bus stream ended, reconnecting");
            }
            Err(e) => {
                warn!(%url, error = %e, "failed to connect to upstream bus");
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
