//! SMS delivery via a signed HTTP gateway.
//!
//! The job payload is `{params, signName, template, createdAt}`. Gateway
//! requests are form-encoded and carry an HMAC-MD5 `sign` over the sorted
//! parameter map. Recipients without a phone number are skipped; gateway
//! failures are logged and the job concludes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use pushgate_common::signing::sign_params;
use pushgate_store::Storer;

use crate::sender::Sender;
use crate::senders::render_template;

pub struct SmsSender {
    store: Arc<dyn Storer>,
    http: reqwest::Client,
    api_url: String,
    app_key: String,
    app_secret: String,
}

#[derive(Debug, Deserialize)]
struct SmsPayload {
    #[serde(default)]
    params: String,
    #[serde(default, rename = "signName")]
    sign_name: String,
    #[serde(default)]
    template: String,
    #[serde(default, rename = "createdAt")]
    #[allow(dead_code)]
    created_at: i64,
}

impl SmsSender {
    pub fn new(
        store: Arc<dyn Storer>,
        api_url: impl Into<String>,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Post one message to the gateway.
    async fn deliver(
        &self,
        phone_number: &str,
        sms_params: &str,
        sign_name: &str,
        template: &str,
    ) -> anyhow::Result<()> {
        let mut params = BTreeMap::new();
        params.insert("app_key".to_string(), self.app_key.clone());
        params.insert(
            "timestamp".to_string(),
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        params.insert("format".to_string(), "json".to_string());
        params.insert("sign_method".to_string(), "hmac".to_string());
        params.insert("sms_type".to_string(), "normal".to_string());
        params.insert("sms_free_sign_name".to_string(), sign_name.to_string());
        params.insert("rec_num".to_string(), phone_number.to_string());
        params.insert("sms_param".to_string(), sms_params.to_string());
        params.insert("sms_template_code".to_string(), template.to_string());
        let sign = sign_params(&self.app_secret, &params);
        params.insert("sign".to_string(), sign);

        let response = self.http.post(&self.api_url).form(&params).send().await?;
        let body: serde_json::Value = response.json().await?;
        if let Some(err) = body.get("error_response") {
            anyhow::bail!("gateway rejected sms: {}", err);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sender for SmsSender {
    fn get_name(&self) -> &str {
        "sendsms"
    }

    async fn send(&self, recipient_id: &str, payload: &str, _counter: u32)
    -> anyhow::Result<u64> {
        let sms: SmsPayload = match serde_json::from_str(payload) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(recipient = %recipient_id, error = %e, "malformed sms payload");
                return Ok(0);
            }
        };

        let recipient = match self.store.get(recipient_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::info!(recipient = %recipient_id, "recipient gone, dropping sms");
                return Ok(0);
            }
            Err(e) => {
                tracing::error!(recipient = %recipient_id, error = %e, "recipient lookup failed");
                return Ok(0);
            }
        };

        if recipient.phone_number.is_empty() {
            return Ok(0);
        }

        let params = render_template(&sms.params, &recipient);
        if let Err(e) = self
            .deliver(&recipient.phone_number, &params, &sms.sign_name, &sms.template)
            .await
        {
            tracing::error!(recipient = %recipient_id, error = %e, "sms delivery failed");
        }
        Ok(0)
    }
}
