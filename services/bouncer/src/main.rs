use bouncer::config;
use bouncer::journal::Journal;
use bouncer::state::BouncerState;
use std::env;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config_path = env::var("BOUNCER_CONFIG").unwrap_or_else(|_| "/etc/eddn/bouncer.toml".to_owned());
    let config = config::load_config_from_path(std::path::Path::new(&config_path))
        .expect("failed to load bouncer config");

    let bind = config.bind.clone();
    let journal = Journal::open(std::path::Path::new(&config.queue_dir))
        .expect("failed to open journal");
    info!(queued = journal.len(), "journal opened");

    let state = BouncerState::new(journal, config);

    tokio::spawn(bouncer::drainer::run(state.clone()));
    tokio::spawn(bouncer::drainer::run_prune(state.clone()));
    spawn_index_flush(state.clone());

    let app = bouncer::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("failed to bind");
    info!(addr = %bind, "bouncer listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("bouncer server error");

    if let Err(e) = state.journal.flush_index() {
        tracing::error!(error = %e, "failed to flush journal index on shutdown");
    }
    info!("bouncer shut down gracefully");
}

fn spawn_index_flush(state: BouncerState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = state.journal.flush_index() {
                tracing::warn!(error = %e, "periodic journal index flush failed");
            }
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
