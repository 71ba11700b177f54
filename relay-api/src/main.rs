//! Relay API Server Entry Point
//!
//! Bootstraps configuration, wires the engine to its collaborators,
//! starts the refresh worker, and serves the Axum router.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay_api::{
    create_router, AppState, HttpOriginFetcher, OAuthCredentialProvider, RelayConfig,
    TokioTaskQueue,
};
use relay_engine::Engine;
use relay_storage::datastore::MemoryDatastore;
use relay_storage::fast_cache::MemoryCache;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env();

    let store = Arc::new(MemoryDatastore::new());
    let cache = Arc::new(MemoryCache::new());
    let (queue, worker) = TokioTaskQueue::new();
    let credentials = Arc::new(OAuthCredentialProvider::new(
        store.clone(),
        config.oauth.clone(),
    ));
    let fetcher = Arc::new(HttpOriginFetcher::new()?);

    let engine = Engine::new(
        store,
        cache,
        Arc::new(queue),
        credentials,
        fetcher,
        config.engine_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(worker.run(engine.clone(), shutdown_rx));

    let app = create_router(AppState::new(engine));
    let addr = config.bind_addr();
    tracing::info!(%addr, "Starting relay API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;
    Ok(())
}
