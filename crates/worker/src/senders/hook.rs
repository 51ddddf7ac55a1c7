//! Generic webhook delivery.
//!
//! Posts `{sender, pusher, data}` form-encoded to the configured URL with a
//! signed `X-Request-Time` / `X-Request-Signature` header pair, so the
//! receiving end can verify the request the same way this service verifies
//! inbound pushes. Hooks are fire-and-forget: failures are logged, never
//! retried.

use std::collections::BTreeMap;

use chrono::Utc;

use pushgate_common::signing::sign_params;

use crate::sender::Sender;

pub struct HookSender {
    name: String,
    url: String,
    secret: String,
    http: reqwest::Client,
}

impl HookSender {
    pub fn new(name: impl Into<String>, url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            secret: secret.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn deliver(&self, recipient_id: &str, payload: &str) -> anyhow::Result<()> {
        let timestamp = Utc::now().timestamp().to_string();

        let mut form = BTreeMap::new();
        form.insert("sender".to_string(), self.name.clone());
        form.insert("pusher".to_string(), recipient_id.to_string());
        form.insert("data".to_string(), payload.to_string());

        let mut sign_input = form.clone();
        sign_input.insert("timestamp".to_string(), timestamp.clone());
        let sign = sign_params(&self.secret, &sign_input);

        let response = self
            .http
            .post(&self.url)
            .header("X-Request-Time", timestamp)
            .header("X-Request-Signature", sign)
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("hook endpoint returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sender for HookSender {
    fn get_name(&self) -> &str {
        &self.name
    }

    async fn send(&self, recipient_id: &str, payload: &str, _counter: u32)
    -> anyhow::Result<u64> {
        if let Err(e) = self.deliver(recipient_id, payload).await {
            tracing::error!(
                hook = %self.name,
                recipient = %recipient_id,
                error = %e,
                "hook delivery failed"
            );
        }
        Ok(0)
    }
}
