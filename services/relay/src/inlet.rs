//! Upstream bus consumption: connect to one or more upstream Gateway/Relay
//! `/bus/v1/subscribe` endpoints, hand each inbound frame to a bounded
//! work queue, and drain it with a fixed pool of worker tasks.
//!
//! A bounded `mpsc` channel plus a fixed worker pool replaces the original's
//! greenlet-per-message fanout: backpressure is explicit (the channel fills,
//! `connect_upstream`'s send awaits) rather than unbounded concurrent spawns.

use crate::state::RelayState;
use crate::transform::{self, Outcome};
use bytes::Bytes;
use ed_bus::Frame;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::StreamExt;
use tracing::{info, warn};

const QUEUE_CAPACITY: usize = 1024;
const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Wire an ingestion topology: one `connect_upstream` task per configured
/// upstream, feeding a bounded queue drained by `inlet_workers` worker
/// tasks pulled from one shared, mutex-guarded receiver.
pub async fn spawn(state: RelayState) {
    let (tx, rx) = mpsc::channel::<Frame>(QUEUE_CAPACITY);

    for upstream in state.config.upstreams.clone() {
        tokio::spawn(connect_upstream(upstream, tx.clone()));
    }
    drop(tx);

    let queue = Arc::new(Mutex::new(rx));
    let worker_count = state.config.inlet_workers.max(1);
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let queue = queue.clone();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let frame = queue.lock().await.recv().await;
                match frame {
                    Some(frame) => process_frame(&state, frame),
                    None => break,
                }
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

fn process_frame(state: &RelayState, frame: Frame) {
    match transform::transform(&frame, &state.nonce, &state.dedupe) {
        Ok(Outcome::Republished { frame, schema_ref }) => {
            state.bus.publish(Bytes::from(frame));
            state.stats.tally("outbound");
            state.stats.tally(&schema_ref);
        }
        Ok(Outcome::Duplicate) => {
            state.stats.tally("duplicate");
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed upstream frame");
            state.stats.tally("inlet_rejected");
        }
    }
}

/// Connect to a single upstream bus-out endpoint and forward every frame it
/// emits onto `tx`. Reconnects with a fixed delay on disconnect; runs until
/// the process shuts down or `tx`'s receiver is dropped.
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
