use relay::config;
use relay::state::RelayState;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config_path = env::var("RELAY_CONFIG").unwrap_or_else(|_| "/etc/eddn/relay.toml".to_owned());
    let config = config::load_config_from_path(std::path::Path::new(&config_path))
        .expect("failed to load relay config");

    let bind = config.bind.clone();
    let state = RelayState::new(config);

    tokio::spawn(relay::inlet::spawn(state.clone()));
    state
        .stats
        .spawn_snapshot_task(ed_stats::StatsCollector::default_snapshot_interval());
    spawn_dedupe_sweep(state.dedupe.clone());

    let app = relay::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("failed to bind");
    info!(addr = %bind, "relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("relay server error");
    info!("relay shut down gracefully");
}

fn spawn_dedupe_sweep(dedupe: std::sync::Arc<ed_dedupe::DuplicateCache>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            dedupe.sweep(std::time::Instant::now());
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
