pub mod config;
pub mod routes;
pub mod state;
pub mod upload;

pub use state::GatewayState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router. The caller binds it with
/// `axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())`
/// so `upload` can resolve the peer address for `header.uploaderIP`.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/upload/", post(upload::upload))
        .route("/", post(upload::upload))
        .route("/stats/", get(routes::stats))
        .route("/ping", get(routes::ping))
        .route("/health", get(routes::health))
        .route("/bus/v1/subscribe", get(routes::subscribe))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
