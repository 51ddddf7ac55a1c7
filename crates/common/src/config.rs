use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection string (store + queue transport)
    pub redis_url: String,

    /// Address the HTTP API binds to
    pub http_addr: String,

    /// App key for signed-request authentication; absent key disables auth
    pub app_key: Option<String>,

    /// Shared secret for signed-request authentication
    pub app_secret: Option<String>,

    /// Namespace prefix for queue names and storage keys (default: "pusher:")
    pub queue_prefix: String,

    /// Number of concurrent worker tasks (default: 2x available cores)
    pub worker_count: usize,

    /// Attempt count at which a sender-requested reschedule gives up instead
    pub max_retry: u32,

    /// Mail provider HTTP endpoint
    pub mail_api_url: Option<String>,

    /// Mail provider API key
    pub mail_api_key: Option<String>,

    /// Mail sender address
    pub mail_from: Option<String>,

    /// Mail sender display name
    pub mail_from_name: Option<String>,

    /// SMS gateway HTTP endpoint
    pub sms_api_url: Option<String>,

    /// SMS gateway app key
    pub sms_app_key: Option<String>,

    /// SMS gateway app secret (signs gateway requests)
    pub sms_app_secret: Option<String>,

    /// Path to a JSON file describing webhook senders
    pub hooks_file: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            http_addr: std::env::var("HTTP_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:6000".to_string()),
            app_key: std::env::var("APP_KEY").ok().filter(|k| !k.is_empty()),
            app_secret: std::env::var("APP_SECRET").ok().filter(|s| !s.is_empty()),
            queue_prefix: std::env::var("QUEUE_PREFIX")
                .unwrap_or_else(|_| crate::DEFAULT_PREFIX.to_string()),
            worker_count: match std::env::var("WORKER_COUNT") {
                Ok(v) => v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("WORKER_COUNT must be a valid usize"))?,
                Err(_) => num_cpus::get() * 2,
            },
            max_retry: std::env::var("MAX_RETRY")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_RETRY must be a valid u32"))?,
            mail_api_url: std::env::var("MAIL_API_URL").ok(),
            mail_api_key: std::env::var("MAIL_API_KEY").ok(),
            mail_from: std::env::var("MAIL_FROM").ok(),
            mail_from_name: std::env::var("MAIL_FROM_NAME").ok(),
            sms_api_url: std::env::var("SMS_API_URL").ok(),
            sms_app_key: std::env::var("SMS_APP_KEY").ok(),
            sms_app_secret: std::env::var("SMS_APP_SECRET").ok(),
            hooks_file: std::env::var("HOOKS_FILE").ok(),
        })
    }

    /// Whether signed-request authentication is enforced.
    pub fn auth_enabled(&self) -> bool {
        self.app_key.is_some()
    }
}
