use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// A delivery channel. Anything with a name and a `send` composes into the
/// worker identically; built-in channels and deployment-specific plugins
/// register the same way.
#[async_trait]
pub trait Sender: Send + Sync {
    /// The channel name; jobs are routed by exact match against the queue
    /// suffix after the shared prefix.
    fn get_name(&self) -> &str;

    /// Deliver `payload` to `recipient_id`. `counter` is the queue-maintained
    /// attempt count for the job being processed.
    ///
    /// Return values:
    /// - `Ok(0)` — delivered (or deliberately dropped); the job is done.
    /// - `Ok(n)` with `n > 0` — not now; retry after `n` seconds.
    /// - `Err` — delivery failed; the queue's redelivery policy takes over.
    async fn send(&self, recipient_id: &str, payload: &str, counter: u32)
    -> anyhow::Result<u64>;
}

/// Name → sender mapping built once at worker startup.
#[derive(Default)]
pub struct SenderRegistry {
    senders: HashMap<String, Arc<dyn Sender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sender under its declared name. A later registration with
    /// the same name replaces the earlier one.
    pub fn register(&mut self, sender: Arc<dyn Sender>) {
        let name = sender.get_name().to_string();
        tracing::info!(sender = %name, "Loaded sender");
        self.senders.insert(name, sender);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Sender>> {
        self.senders.get(name).cloned()
    }

    /// All registered sender names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.senders.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedSender(&'static str);

    #[async_trait]
    impl Sender for NamedSender {
        fn get_name(&self) -> &str {
            self.0
        }

        async fn send(&self, _recipient_id: &str, _payload: &str, _counter: u32)
        -> anyhow::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn lookup_is_by_exact_name() {
        let mut registry = SenderRegistry::new();
        registry.register(Arc::new(NamedSender("sendmail")));
        registry.register(Arc::new(NamedSender("sendsms")));

        assert!(registry.get("sendmail").is_some());
        assert!(registry.get("sendmai").is_none());
        assert!(registry.get("sendmails").is_none());

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, ["sendmail", "sendsms"]);
    }

    #[test]
    fn later_registration_wins() {
        let mut registry = SenderRegistry::new();
        registry.register(Arc::new(NamedSender("hook")));
        registry.register(Arc::new(NamedSender("hook")));
        assert_eq!(registry.names().len(), 1);
    }
}
