//! Mail delivery via an HTTP mail provider.
//!
//! The job payload is a JSON document `{subject, text, createdAt}`; `text`
//! may reference recipient fields through template placeholders. Recipients
//! without an email address are skipped. Provider failures are logged and
//! the job concludes; mail is not retried by the pipeline.

use std::sync::Arc;

use serde::Deserialize;

use pushgate_common::types::Recipient;
use pushgate_store::Storer;

use crate::sender::Sender;
use crate::senders::render_template;

pub struct MailSender {
    store: Arc<dyn Storer>,
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    from_name: String,
}

#[derive(Debug, Deserialize)]
struct MailPayload {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    text: String,
    #[serde(default, rename = "createdAt")]
    #[allow(dead_code)]
    created_at: i64,
}

impl MailSender {
    pub fn new(
        store: Arc<dyn Storer>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
            from_name: from_name.into(),
        }
    }

    async fn deliver(&self, recipient: &Recipient, mail: &MailPayload) -> anyhow::Result<()> {
        let html = render_template(&mail.text, recipient);
        let body = serde_json::json!({
            "from": { "email": self.from, "name": self.from_name },
            "to": [{ "email": recipient.email, "name": recipient.nickname }],
            "subject": mail.subject,
            "html": html,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("mail provider returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sender for MailSender {
    fn get_name(&self) -> &str {
        "sendmail"
    }

    async fn send(&self, recipient_id: &str, payload: &str, _counter: u32)
    -> anyhow::Result<u64> {
        let mail: MailPayload = match serde_json::from_str(payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(recipient = %recipient_id, error = %e, "malformed mail payload");
                return Ok(0);
            }
        };

        let recipient = match self.store.get(recipient_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::info!(recipient = %recipient_id, "recipient gone, dropping mail");
                return Ok(0);
            }
            Err(e) => {
                tracing::error!(recipient = %recipient_id, error = %e, "recipient lookup failed");
                return Ok(0);
            }
        };

        if recipient.email.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.deliver(&recipient, &mail).await {
            tracing::error!(recipient = %recipient_id, error = %e, "mail delivery failed");
        }
        Ok(0)
    }
}
