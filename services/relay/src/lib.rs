pub mod config;
pub mod inlet;
pub mod nonce;
pub mod routes;
pub mod state;
pub mod transform;

pub use state::RelayState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Relay accepts no uploads: it is fed exclusively by `inlet::spawn`
/// consuming one or more upstream buses, so the router exposes only the
/// read-only surfaces.
pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/stats/", get(routes::stats))
        .route("/ping", get(routes::ping))
        .route("/bus/v1/subscribe", get(routes::subscribe))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
