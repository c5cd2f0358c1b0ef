use crate::state::GatewayState;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
struct StatsResponse {
    version: &'static str,
    stats: HashMap<String, ed_stats::NameStats>,
}

pub async fn stats(State(state): State<GatewayState>) -> impl IntoResponse {
    let summary = state.stats.get_summary();
    axum::Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION"),
        stats: summary.names,
    })
}

pub async fn ping() -> impl IntoResponse {
    "pong"
}

/// Ready once the schema registry has loaded and the bus publisher exists;
/// in this design both happen at startup before the listener binds, so this
/// is effectively always-ready post-bind. Kept as its own route rather than
/// folded into `/ping` because downstream orchestration tooling expects it.
pub async fn health(State(_state): State<GatewayState>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}

#[derive(Deserialize)]
pub struct SubscribeQuery {
    topic: Option<String>,
}

pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(query): Query<SubscribeQuery>,
) -> impl IntoResponse {
    ed_bus::bus_ws::serve(ws, state.bus.clone(), query.topic).await
}
