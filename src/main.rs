//! Server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use chattap::ProxyError;
use chattap::config::Config;
use chattap::proxy::{AppState, router};
use chattap::storage::{RecordStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open(&config.db_path)?);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|err| {
            ProxyError::ConfigError(format!("failed to bind {}: {err}", config.listen_addr))
        })?;
    tracing::info!(
        "listening on {}, forwarding to {}",
        config.listen_addr,
        config.upstream_url
    );

    let app = router(AppState::new(config, store)?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|err| ProxyError::HttpError(format!("server error: {err}")))?;

    Ok(())
}
