use anyhow::Context;
use metrics_api::{
    config::{AppConfig, StoreConfig},
    router,
    store::{InMemoryMetricsStore, MetricsStore, PgMetricsStore, RedisMetricsStore},
    AppState,
};
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn connect_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn MetricsStore>> {
    let store: Arc<dyn MetricsStore> = match config {
        StoreConfig::Postgres {
            url,
            max_connections,
        } => Arc::new(
            PgMetricsStore::connect(url, *max_connections)
                .await
                .context("failed to connect to postgres")?,
        ),
        StoreConfig::Redis { url } => Arc::new(
            RedisMetricsStore::connect(url)
                .await
                .context("failed to connect to redis")?,
        ),
        StoreConfig::Memory => {
            tracing::warn!("using the in-memory metrics store; data is not persisted");
            Arc::new(InMemoryMetricsStore::new())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = connect_store(&config.store).await?;
    let state = AppState::new(&config, store);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, store = config.store.kind(), "metrics api starting");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("metrics api exited with error")?;

    Ok(())
}
