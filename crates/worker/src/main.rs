//! Pushgate delivery worker binary entrypoint.

use std::sync::Arc;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use pushgate_common::config::AppConfig;
use pushgate_common::redis_pool::create_redis_pool;
use pushgate_dispatch::Dispatcher;
use pushgate_queue::RedisQueue;
use pushgate_store::RedisStore;

use pushgate_worker::senders::{BroadcastFanout, HookSender, MailSender, SmsSender};
use pushgate_worker::{SenderRegistry, Worker};

/// One webhook sender definition from the hooks file.
#[derive(Debug, Deserialize)]
struct HookConfig {
    name: String,
    url: String,
    secret: String,
}

fn load_hooks(path: &str) -> anyhow::Result<Vec<HookConfig>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("pushgate_worker=debug,pushgate_dispatch=debug,pushgate_queue=debug")
        }))
        .init();

    tracing::info!("Starting Pushgate worker...");

    let config = AppConfig::from_env()?;

    let redis = create_redis_pool(&config.redis_url).await?;
    let store = Arc::new(RedisStore::new(redis.clone(), config.queue_prefix.clone()));
    let queue = Arc::new(RedisQueue::new(redis));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        queue.clone(),
        config.queue_prefix.clone(),
    ));

    let mut registry = SenderRegistry::new();

    if let (Some(url), Some(key), Some(from)) = (
        config.mail_api_url.as_deref(),
        config.mail_api_key.as_deref(),
        config.mail_from.as_deref(),
    ) {
        let from_name = config.mail_from_name.clone().unwrap_or_default();
        registry.register(Arc::new(MailSender::new(
            store.clone(),
            url,
            key,
            from,
            from_name,
        )));
    }

    if let (Some(url), Some(key), Some(secret)) = (
        config.sms_api_url.as_deref(),
        config.sms_app_key.as_deref(),
        config.sms_app_secret.as_deref(),
    ) {
        registry.register(Arc::new(SmsSender::new(store.clone(), url, key, secret)));
    }

    if let Some(path) = config.hooks_file.as_deref() {
        for hook in load_hooks(path)? {
            registry.register(Arc::new(HookSender::new(hook.name, hook.url, hook.secret)));
        }
    }

    registry.register(Arc::new(BroadcastFanout::new(
        store.clone(),
        dispatcher.clone(),
    )));

    let worker = Arc::new(Worker::new(
        queue,
        Arc::new(registry),
        config.queue_prefix.clone(),
        config.max_retry,
    ));

    worker.run(config.worker_count).await;

    Ok(())
}
