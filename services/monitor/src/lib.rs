pub mod config;
pub mod db;
pub mod ingest;
pub mod repo;
pub mod response;
pub mod routes;
pub mod state;

pub use state::MonitorState;

use axum::http::{HeaderName, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Matches `original_source/src/eddn/Monitor.py::EnableCors` exactly: every
/// response carries these headers, not just preflight `OPTIONS` ones.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("origin"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-csrf-token"),
        ])
}

pub fn build_router(state: MonitorState) -> Router {
    Router::new()
        .route("/ping", get(routes::ping))
        .route("/getTotalSchemas/", get(routes::get_total_schemas))
        .route("/getSchemas/", get(routes::get_schemas))
        .route("/getTotalSoftwares/", get(routes::get_total_softwares))
        .route("/getSoftwares/", get(routes::get_softwares))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
