use crate::state::BouncerState;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Serialize)]
struct StatsResponse {
    version: &'static str,
    queued: usize,
    queue_bytes: u64,
}

pub async fn stats(State(state): State<BouncerState>) -> impl IntoResponse {
    axum::Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION"),
        queued: state.journal.len(),
        queue_bytes: state.queue_bytes_on_disk(),
    })
}

pub async fn ping() -> impl IntoResponse {
    "pong"
}
