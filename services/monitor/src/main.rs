use monitor::config;
use monitor::state::MonitorState;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config_path = env::var("MONITOR_CONFIG").unwrap_or_else(|_| "/etc/eddn/monitor.toml".to_owned());
    let config = config::load_config_from_path(std::path::Path::new(&config_path))
        .expect("failed to load monitor config");

    info!("connecting to database...");
    let pool = monitor::db::create_pool(&config.database_url, config.ingest_workers as u32 + 2).await;
    monitor::db::run_migrations(&pool).await;
    info!("migrations applied");

    let bind = config.bind.clone();
    let state = MonitorState::new(pool, config);

    tokio::spawn(monitor::ingest::spawn(state.clone()));

    let app = monitor::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("failed to bind");
    info!(addr = %bind, "monitor listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("monitor server error");
    info!("monitor shut down gracefully");
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
