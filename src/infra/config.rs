use std::time::Duration;

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct OutlineConfig {
    /// Management API base, e.g. `https://host:port/SECRET`.
    pub api_url: Url,
    /// SHA-256 fingerprint of the server's self-signed certificate,
    /// hex-encoded, optionally colon-separated.
    pub cert_sha256: String,
    pub timeout: Duration,
}

pub struct AppConfig {
    pub bot_token: SecretString,
    pub admin_id: i64,
    /// Billing provider credential. Empty for Telegram Stars.
    pub provider_token: SecretString,
    pub outline: OutlineConfig,
    pub database_url: String,
    pub rate_limit_per_minute: usize,
    pub broadcast_delay_ms: u64,
    pub support_url: Url,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bot_token: SecretString = SecretString::new(get_env::<String>("BOT_TOKEN").into());
        let admin_id: i64 = get_env("ADMIN_ID");
        let provider_token: SecretString =
            SecretString::new(get_env_default("PROVIDER_TOKEN", String::new()).into());

        let api_url: Url = get_env("OUTLINE_API_URL");
        let cert_sha256: String = get_env("OUTLINE_CERT_SHA256");
        let outline_timeout_secs: u64 = get_env_default("OUTLINE_TIMEOUT_SECS", 10);

        let database_url: String = get_env("DATABASE_URL");
        let rate_limit_per_minute: usize = get_env_default("RATE_LIMIT_PER_MINUTE", 5);
        let broadcast_delay_ms: u64 = get_env_default("BROADCAST_DELAY_MS", 50);
        let support_url: Url = get_env_default(
            "SUPPORT_URL",
            "https://t.me/cometvpn_support".parse().unwrap(),
        );

        Self {
            bot_token,
            admin_id,
            provider_token,
            outline: OutlineConfig {
                api_url,
                cert_sha256,
                timeout: Duration::from_secs(outline_timeout_secs),
            },
            database_url,
            rate_limit_per_minute,
            broadcast_delay_ms,
            support_url,
        }
    }
}
