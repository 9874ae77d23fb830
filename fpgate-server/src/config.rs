use std::{env, time::Duration};

use fpgate_core::OriginPolicy;

/// Environment variable holding the HMAC secret for session tokens. Read
/// through [`fpgate_core::EnvSecretSource`] on every mint/verify so a
/// rotated secret applies to the next request without a restart.
pub const SESSION_SECRET_ENV: &str = "FP_SESSION_SECRET";

/// Server configuration loaded from environment variables (with `.env`
/// support via dotenvy). Secrets needed per-request are deliberately not
/// cached here; see [`SESSION_SECRET_ENV`].
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    /// Public base URL of the deployment, trailing slashes stripped. Also
    /// the root the relay forwards to.
    pub base_url: String,

    /// Canonical production origin, allowed in addition to the base URL.
    pub public_origin: Option<String>,

    /// Extra comma-separated origins from `ALLOWED_ORIGINS`.
    pub extra_allowed_origins: Vec<String>,

    /// Shared secret injected into the relay's upstream call.
    pub relay_api_secret: Option<String>,

    // Telegram notification settings
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,

    /// Bound on the outbound relay/notify requests.
    pub relay_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let base_url = env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),

            base_url: base_url.trim_end_matches('/').to_string(),
            public_origin: env::var("PUBLIC_ORIGIN").ok().filter(|v| !v.is_empty()),

            extra_allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            relay_api_secret: env::var("RELAY_API_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            telegram_api_base: env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string())
                .trim_end_matches('/')
                .to_string(),

            relay_timeout: Duration::from_secs(
                env::var("RELAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }

    /// Full origin allow-list: base URL, the localhost dev origin, the
    /// canonical production origin, then any configured extras.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![
            self.base_url.clone(),
            "http://localhost:3000".to_string(),
        ];
        if let Some(public) = &self.public_origin {
            origins.push(public.clone());
        }
        origins.extend(self.extra_allowed_origins.iter().cloned());
        origins
    }

    pub fn origin_policy(&self) -> OriginPolicy {
        OriginPolicy::new(self.allowed_origins())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
