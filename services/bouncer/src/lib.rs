pub mod config;
pub mod drainer;
pub mod intake;
pub mod journal;
pub mod routes;
pub mod state;

pub use state::BouncerState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Bouncer mounts the same upload surface as the Gateway, without
/// validation: its job is to absorb uploads while the Gateway is down, not
/// to enforce the upload contract.
pub fn build_router(state: BouncerState) -> Router {
    Router::new()
        .route("/upload/", post(intake::upload))
        .route("/", post(intake::upload))
        .route("/stats/", get(routes::stats))
        .route("/ping", get(routes::ping))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
