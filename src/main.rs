use dotenvy::dotenv;
use pulsewatch::config::Config;
use pulsewatch::services::twilio_service::TwilioService;
use pulsewatch::services::worker;
use pulsewatch::store::{FileStore, LogStore};
use pulsewatch::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .compact()
        .init();

    let config = Arc::new(Config::from_env());
    tracing::info!("Environment loaded ({})", config.env_name);

    let store = Arc::new(FileStore::open(&config.data_dir).await?);
    let logs = Arc::new(LogStore::open(&config.log_dir).await?);
    let notifier = Arc::new(TwilioService::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_from_phone.clone(),
    ));

    let state = AppState {
        store,
        logs,
        notifier,
        config: config.clone(),
    };

    let workers = worker::start(state.clone());

    let app = pulsewatch::app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("pulsewatch is listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workers.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
