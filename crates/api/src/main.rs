//! Pushgate API server binary entrypoint.

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pushgate_api::routes::create_router;
use pushgate_api::state::AppState;
use pushgate_common::config::AppConfig;
use pushgate_common::redis_pool::create_redis_pool;
use pushgate_dispatch::Dispatcher;
use pushgate_queue::RedisQueue;
use pushgate_store::RedisStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("pushgate_api=debug,pushgate_dispatch=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Pushgate API server...");

    let config = AppConfig::from_env()?;
    if config.auth_enabled() {
        tracing::info!("Signed-request authentication enabled");
    } else {
        tracing::warn!("No APP_KEY configured, running without authentication");
    }

    let redis = create_redis_pool(&config.redis_url).await?;
    let store = Arc::new(RedisStore::new(redis.clone(), config.queue_prefix.clone()));
    let queue = Arc::new(RedisQueue::new(redis));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        queue,
        config.queue_prefix.clone(),
    ));

    let state = AppState::new(store, dispatcher, config.clone());

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(addr = %config.http_addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
