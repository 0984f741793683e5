//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (backend features)
//! - `GTM_SUPABASE_URL` - Base URL of the hosted backend project
//! - `GTM_SUPABASE_ANON_KEY` - Public anon API key (high entropy)
//!
//! ## Optional
//! - `GTM_DATA_DIR` - Directory for local storage slots (default: .gtm)
//! - `GTM_CATALOG_PATH` - JSON catalog overriding the bundled one
//! - `GTM_CURRENCY` - Currency code for charges (default: USD)
//! - `GTM_PAYMENT_FUNCTION` - Payment edge function name (default: process-payment)
//! - `GTM_EMAIL_REDIRECT_URL` - Redirect URL embedded in confirmation emails
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: development)
//! - `SENTRY_SAMPLE_RATE` - Sentry traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::path::PathBuf;

use gtm_shop_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_DATA_DIR: &str = ".gtm";
const DEFAULT_PAYMENT_FUNCTION: &str = "process-payment";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Local-only configuration; enough to run the cart and catalog offline.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Directory holding storage slot files
    pub data_dir: PathBuf,
    /// Catalog file overriding the bundled catalog
    pub catalog_path: Option<PathBuf>,
}

/// Hosted backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL (e.g. `https://abc.supabase.co`)
    pub url: Url,
    /// Anon API key sent as `apikey` and default bearer token
    pub anon_key: SecretString,
    /// Edge function that processes payments
    pub payment_function: String,
    /// Redirect URL for sign-up confirmation emails
    pub email_redirect_url: Option<String>,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("payment_function", &self.payment_function)
            .field("email_redirect_url", &self.email_redirect_url)
            .finish()
    }
}

/// Error tracking configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Sentry DSN; reporting is disabled when absent
    pub sentry_dsn: Option<String>,
    /// Environment tag attached to events
    pub environment: String,
    /// Traces sample rate in `0.0..=1.0`
    pub sample_rate: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sentry_dsn: None,
            environment: "development".to_string(),
            sample_rate: 1.0,
        }
    }
}

/// Full storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Local storage and catalog settings
    pub cart: CartConfig,
    /// Hosted backend settings
    pub supabase: SupabaseConfig,
    /// Currency used for charges
    pub currency: CurrencyCode,
}

impl CartConfig {
    /// Load local settings from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            data_dir: PathBuf::from(get_env_or_default("GTM_DATA_DIR", DEFAULT_DATA_DIR)),
            catalog_path: get_optional_env("GTM_CATALOG_PATH").map(PathBuf::from),
        }
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("GTM_SUPABASE_URL")?;
        let url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("GTM_SUPABASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "GTM_SUPABASE_URL".to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        Ok(Self {
            url,
            anon_key: get_validated_secret("GTM_SUPABASE_ANON_KEY")?,
            payment_function: get_env_or_default("GTM_PAYMENT_FUNCTION", DEFAULT_PAYMENT_FUNCTION),
            email_redirect_url: get_optional_env("GTM_EMAIL_REDIRECT_URL"),
        })
    }
}

impl TelemetryConfig {
    /// Load error tracking settings from environment variables.
    ///
    /// Never fails; an unparsable sample rate falls back to 1.0.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|r| (0.0..=1.0).contains(r))
            .unwrap_or(1.0);

        Self {
            sentry_dsn: get_optional_env("SENTRY_DSN").filter(|s| !s.trim().is_empty()),
            environment: get_env_or_default("SENTRY_ENVIRONMENT", "development"),
            sample_rate,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let cart = CartConfig::from_env();
        let supabase = SupabaseConfig::from_env()?;
        let currency = get_env_or_default("GTM_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("GTM_CURRENCY".to_string(), e))?;

        Ok(Self {
            cart,
            supabase,
            currency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
