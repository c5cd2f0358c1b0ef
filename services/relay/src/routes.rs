use crate::state::RelayState;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
struct StatsResponse {
    version: &'static str,
    stats: HashMap<String, ed_stats::NameStats>,
}

pub async fn stats(State(state): State<RelayState>) -> impl IntoResponse {
    let summary = state.stats.get_summary();
    axum::Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION"),
        stats: summary.names,
    })
}

pub async fn ping() -> impl IntoResponse {
    "pong"
}

#[derive(Deserialize)]
pub struct SubscribeQuery {
    topic: Option<String>,
}

pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
    Query(query): Query<SubscribeQuery>,
) -> impl IntoResponse {
    ed_bus::bus_ws::serve(ws, state.bus.clone(), query.topic).await
}
