//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `ORDERPAY_ENV` - `staging` (default) or `production`
//! - `ORDERPAY_DATA_DIR` - Root directory for records and audit logs (default: `.data`)
//! - `ORDERPAY_CATALOG` - Optional CSV menu (`id,name,price`); the standard menu otherwise
//! - `ORDERPAY_HASHING_SECRET` - HMAC key for password hashes (required in production)
//! - `ORDERPAY_SETTLE_INTERVAL_SECS` - Settlement period (default: 60)
//! - `ORDERPAY_ROTATE_INTERVAL_SECS` - Audit log rotation period (default: 86400)
//! - `ORDERPAY_LOG_JSON` - Emit JSON logs when `true`
//! - `STRIPE_SECRET_KEY` / `STRIPE_API_URL` - Payment gateway; sandbox gateway when unset
//! - `MAILGUN_API_KEY` / `MAILGUN_DOMAIN_URL` / `MAILGUN_FROM` - Notifier; log-only when unset

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_STRIPE_URL: &str = "https://api.stripe.com/v1/charges";
const STAGING_HASHING_SECRET: &str = "staging-hashing-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" => Environment::Production,
            _ => Environment::Staging,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct MailgunConfig {
    /// `user:key` pair for basic auth, e.g. `api:key-123`.
    pub api_key: SecretString,
    /// Messages endpoint of the sending domain.
    pub messages_url: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub data_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub hashing_secret: SecretString,
    pub settle_interval: Duration,
    pub rotate_interval: Duration,
    pub log_json: bool,
    pub stripe: Option<StripeConfig>,
    pub mailgun: Option<MailgunConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, or if production is
    /// selected without a hashing secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = Environment::parse(&get_env_or_default("ORDERPAY_ENV", "staging"));
        let hashing_secret = match (get_optional_env("ORDERPAY_HASHING_SECRET"), environment) {
            (Some(secret), _) => SecretString::from(secret),
            (None, Environment::Staging) => SecretString::from(STAGING_HASHING_SECRET),
            (None, Environment::Production) => {
                return Err(ConfigError::MissingEnvVar(
                    "ORDERPAY_HASHING_SECRET".to_string(),
                ));
            }
        };

        Ok(Self {
            environment,
            data_dir: PathBuf::from(get_env_or_default("ORDERPAY_DATA_DIR", ".data")),
            catalog_path: get_optional_env("ORDERPAY_CATALOG").map(PathBuf::from),
            hashing_secret,
            settle_interval: get_secs("ORDERPAY_SETTLE_INTERVAL_SECS", 60)?,
            rotate_interval: get_secs("ORDERPAY_ROTATE_INTERVAL_SECS", 60 * 60 * 24)?,
            log_json: get_env_or_default("ORDERPAY_LOG_JSON", "false") == "true",
            stripe: StripeConfig::from_env(),
            mailgun: MailgunConfig::from_env()?,
        })
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

impl StripeConfig {
    fn from_env() -> Option<Self> {
        get_optional_env("STRIPE_SECRET_KEY").map(|key| Self {
            secret_key: SecretString::from(key),
            api_url: get_env_or_default("STRIPE_API_URL", DEFAULT_STRIPE_URL),
        })
    }
}

impl MailgunConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_env("MAILGUN_API_KEY") else {
            return Ok(None);
        };
        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            messages_url: get_required_env("MAILGUN_DOMAIN_URL")?,
            from: get_required_env("MAILGUN_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs = match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
