//! Checkout server configuration

use secrecy::SecretString;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SMTP relay settings; absent means notifications are only logged
#[derive(Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

/// Checkout server configuration
#[derive(Debug)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Paystack secret key (API bearer token and webhook HMAC key)
    pub paystack_secret_key: SecretString,
    /// Paystack API base URL
    pub paystack_base_url: String,
    /// Where Paystack redirects the shopper after payment
    pub payment_callback_url: Option<String>,
    /// Upper bound for a single gateway call
    pub gateway_timeout: Duration,
    /// JWT secret for customer authentication
    pub jwt_secret: SecretString,
    /// Cart retention window, refreshed on every write
    pub cart_ttl: Duration,
    /// Maximum number of live carts held in memory
    pub cart_max_capacity: u64,
    /// Contact email used when a guest gives none
    pub guest_email_placeholder: String,
    pub smtp: Option<SmtpConfig>,
    /// Delivery attempts per notification before giving up
    pub notify_max_attempts: u32,
    /// Pending confirmations held before new ones are dropped
    pub notify_queue_capacity: usize,
    /// How long shutdown waits for pending confirmations
    pub shutdown_grace: Duration,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<SecretString, BoxError> {
        Self::secret_or_dev_placeholder(name, std::env::var(name).ok(), environment)
    }

    fn secret_or_dev_placeholder(
        name: &str,
        value: Option<String>,
        environment: &str,
    ) -> Result<SecretString, BoxError> {
        let val = match value {
            Some(v) => v,
            None if environment == "development" => format!("dev-{name}-not-for-production"),
            None => return Err(format!("{name} must be set in {environment} environment").into()),
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(SecretString::from(val))
    }

    fn smtp_from_env() -> Option<SmtpConfig> {
        let host = std::env::var("SMTP_HOST").ok().filter(|s| !s.is_empty())?;
        Some(SmtpConfig {
            host,
            port: env_or("SMTP_PORT", 587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: SecretString::from(std::env::var("SMTP_PASSWORD").unwrap_or_default()),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "orders@localhost".into()),
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_or("HTTP_PORT", 8080),
            paystack_secret_key: Self::require_secret("PAYSTACK_SECRET_KEY", &environment)?,
            paystack_base_url: std::env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".into()),
            payment_callback_url: std::env::var("PAYMENT_CALLBACK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            gateway_timeout: Duration::from_secs(env_or("GATEWAY_TIMEOUT_SECS", 15)),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            cart_ttl: Duration::from_secs(env_or("CART_TTL_SECS", 7 * 24 * 60 * 60)),
            cart_max_capacity: env_or("CART_MAX_CAPACITY", 100_000),
            guest_email_placeholder: std::env::var("GUEST_EMAIL_PLACEHOLDER")
                .unwrap_or_else(|_| "guest@example.com".into()),
            smtp: Self::smtp_from_env(),
            notify_max_attempts: env_or("NOTIFY_MAX_ATTEMPTS", 5),
            notify_queue_capacity: env_or("NOTIFY_QUEUE_CAPACITY", 1024),
            shutdown_grace: Duration::from_secs(env_or("SHUTDOWN_GRACE_SECS", 30)),
            environment,
        })
    }
}
