//! Background forwarder: pops the oldest journal entry, POSTs it to the
//! upstream Gateway, and retries with exponential backoff on failure.
//!
//! Grounded on `services/forwarder/src/uplink.rs`'s connect/retry shape,
//! swapped from a persistent WS session to one-shot `reqwest` POSTs since
//! the upstream here is the Gateway's plain HTTP upload endpoint.

use crate::state::BouncerState;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn run(state: BouncerState) {
    let client = Client::new();
    let mut backoff = MIN_BACKOFF;
    let max_backoff = Duration::from_secs(state.config.drain_backoff_max_seconds);

    loop {
        let Some(entry) = state.journal.peek() else {
            tokio::time::sleep(Duration::from_millis(500)).await;
            continue;
        };

        let body = match state.journal.read_body(&entry) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "dropping unreadable journal entry");
                state.journal.pop_front();
                continue;
            }
        };

        match forward(&client, &state.config.upstream_url, &entry.headers, body).await {
            Ok(()) => {
                state.journal.pop_front();
                backoff = MIN_BACKOFF;
            }
            Err(e) => {
                warn!(error = %e, backoff_secs = backoff.as_secs(), "forward failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }
}

async fn forward(
    client: &Client,
    upstream_url: &str,
    headers: &[(String, String)],
    body: Vec<u8>,
) -> Result<(), reqwest::Error> {
    let mut request = client.post(upstream_url).body(body);
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        request = request.header(name, value);
    }
    let response = request.send().await?;
    response.error_for_status().map(|_| ())
}

/// Periodic prune pass discarding entries older than the configured max age
/// (spec default 7 days).
pub async fn run_prune(state: BouncerState) {
    let max_age = Duration::from_secs(state.config.max_entry_age_days * 24 * 3600);
    let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let pruned = state.journal.prune_expired(max_age);
        if pruned > 0 {
            info!(pruned, "pruned expired journal entries");
        }
    }
}
