use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::client::retry::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "hearth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "hearth-storefront".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
        };
        Ok(Self { database_url, jwt })
    }
}

/// Settings for the storefront side of the cart: where the server lives,
/// where the local cart is kept, and how pushes are paced.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub debounce: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v1".into(),
            storage_path: PathBuf::from("cart.json"),
            debounce: Duration::from_millis(3000),
            http_timeout: Duration::from_millis(10_000),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut retry = defaults.retry.clone();
        if let Some(attempts) = env_parse::<u32>("CART_SYNC_MAX_ATTEMPTS") {
            retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = env_parse::<u64>("CART_SYNC_BACKOFF_MS") {
            retry.initial_backoff = Duration::from_millis(ms);
        }

        Self {
            api_base_url: std::env::var("CART_API_BASE_URL").unwrap_or(defaults.api_base_url),
            storage_path: std::env::var("CART_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            debounce: env_parse("CART_SYNC_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            http_timeout: env_parse("CART_HTTP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.http_timeout),
            retry,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
