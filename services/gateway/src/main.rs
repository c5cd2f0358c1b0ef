use gateway::config;
use gateway::state::GatewayState;
use std::env;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config_path = env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "/etc/eddn/gateway.toml".to_owned());
    let config = config::load_config_from_path(std::path::Path::new(&config_path))
        .expect("failed to load gateway config");

    info!(schema_dir = %config.schema_dir, "loading schema registry");
    let schemas = ed_schema::SchemaRegistry::load_dir(&config.schema_dir)
        .expect("failed to load schema directory");
    info!(count = schemas.len(), "schema registry loaded");

    let bind = config.bind.clone();
    let state = GatewayState::new(schemas, config);

    spawn_dedupe_sweep(state.dedupe.clone());
    state
        .stats
        .spawn_snapshot_task(ed_stats::StatsCollector::default_snapshot_interval());

    let app = gateway::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("failed to bind");
    info!(addr = %bind, "gateway listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("gateway server error");
    info!("gateway shut down gracefully");
}

fn spawn_dedupe_sweep(dedupe: std::sync::Arc<ed_dedupe::DuplicateCache>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            dedupe.sweep(Instant::now());
        }
    });
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
