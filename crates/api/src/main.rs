#![forbid(unsafe_code)]

use ct_api::{AppState, DEFAULT_LOG_FILTER, ServerConfig, create_router};
use tracing_subscriber::EnvFilter;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage() -> &'static str {
    "cardtree: card tree HTTP service\n\n\
USAGE:\n\
  cardtree [--storage-dir DIR] [--bind ADDR] [--request-timeout-ms MS] [--user-header NAME]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version and exit\n\
\n\
ENV:\n\
  CARDTREE_STORAGE_DIR, CARDTREE_ADDR, CARDTREE_PORT (or PORT),\n\
  CARDTREE_REQUEST_TIMEOUT_MS, CARDTREE_USER_HEADER, RUST_LOG\n"
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("cardtree {SERVER_VERSION}");
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let bind = config.bind;
    let state = AppState::open(config)?;
    tracing::info!(
        storage = %state.config().storage_dir.display(),
        timeout_ms = state.config().request_timeout.as_millis() as u64,
        "card tree store ready"
    );

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "cardtree listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
