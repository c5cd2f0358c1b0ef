//! The internal pub/sub bus: an in-process broadcast core plus a WebSocket
//! bridge so the bus can be fanned out across OS processes (Gateway ->
//! Relay, Gateway -> Monitor), the way the teacher's `ws_forwarder` /
//! `ws_receiver` pair bridges forwarders and receivers through `AppState`.

pub mod bus_ws;

use bytes::Bytes;
use ed_protocol::topic::decode_frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A single on-wire frame already carrying its topic prefix
/// (`<topic> |-| <compressed bytes>`), see `ed_protocol::topic::encode_frame`.
pub type Frame = Bytes;

const DEFAULT_CAPACITY: usize = 500;

/// The internal bus. Clone is cheap: it shares the same broadcast channel
/// and dropped-frame counter.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<Frame>,
    dropped: Arc<AtomicU64>,
}

impl Bus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Bus {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish a frame. Non-blocking: `broadcast::Sender::send` never awaits,
    /// so this never stalls the caller regardless of subscriber backlog
    /// (spec: "must not block longer than a bounded enqueue time").
    pub fn publish(&self, frame: Frame) {
        match self.sender.send(frame) {
            Ok(_receivers) => {}
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("published frame with no subscribers");
            }
        }
    }

    /// Subscribe, optionally filtering to frames whose topic starts with
    /// `topic_prefix`. An absent prefix is a wildcard subscription.
    pub fn subscribe(&self, topic_prefix: Option<String>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            topic_prefix: topic_prefix.unwrap_or_default(),
        }
    }

    /// Count of publishes that reached zero subscribers. Tallied into
    /// `ed_stats` by the owning service as `bus_dropped`.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a single `Subscription::recv()` call.
#[derive(Debug)]
pub enum RecvOutcome {
    Frame(Frame),
    /// The subscriber fell behind and the broadcast channel dropped the
    /// oldest `n` frames before this receiver could read them.
    Lagged(u64),
    Closed,
}

/// A bus subscription with client-side topic-prefix filtering, mirroring
/// how the original EDDN subscriber binds `zmq.SUBSCRIBE` to an empty
/// string and filters application-side.
pub struct Subscription {
    receiver: broadcast::Receiver<Frame>,
    topic_prefix: String,
}

impl Subscription {
    /// Wait for the next frame matching this subscription's topic prefix,
    /// skipping non-matching frames. Returns `Lagged` at most once per gap
    /// rather than looping silently, so callers can tally the loss.
    pub async fn recv(&mut self) -> RecvOutcome {
        loop {
            match self.receiver.recv().await {
                Ok(frame) => {
                    let (topic, _) = decode_frame(&frame);
                    let matches = topic
                        .map(|t| t.starts_with(self.topic_prefix.as_str()))
                        .unwrap_or(self.topic_prefix.is_empty());
                    if matches {
                        return RecvOutcome::Frame(frame);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => return RecvOutcome::Lagged(n),
                Err(broadcast::error::RecvError::Closed) => return RecvOutcome::Closed,
            }
        }
    }
}
