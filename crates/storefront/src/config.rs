//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional:
//! - `STOREFRONT_API_URL` - Account API base URL (default: `http://127.0.0.1:3000/api`)
//! - `STOREFRONT_DATA_DIR` - Directory for persisted cart/wishlist/session (default: `.bazaar`)
//! - `STOREFRONT_CURRENCY` - ISO 4217 store currency (default: USD)
//! - `STOREFRONT_COIN_DISCOUNT` - Flat discount while redeeming coins (default: 100)
//! - `STOREFRONT_COIN_EARN_RATE` - Coins earned per unit of subtotal (default: 0.05)
//! - `STOREFRONT_HTTP_TIMEOUT_SECS` - Account API request timeout (default: 10)
//! - `STOREFRONT_OTP_TTL_SECS` - One-time login code lifetime (default: 300)
//! - `STOREFRONT_CHECKOUT_DELAY_MS` - Simulated order processing time (default: 500)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use bazaar_core::CurrencyCode;

use crate::cart::LoyaltyRules;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Account API settings
    pub api: ApiConfig,
    /// Directory holding persisted state
    pub data_dir: PathBuf,
    /// Store currency for display
    pub currency: CurrencyCode,
    /// Loyalty-coin rules
    pub loyalty: LoyaltyRules,
    /// Mocked one-time-code login settings
    pub otp: OtpConfig,
    /// Mocked checkout settings
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Account API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; endpoint paths are appended to it
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// One-time login code configuration.
#[derive(Debug, Clone, Copy)]
pub struct OtpConfig {
    /// How long an issued code stays valid
    pub ttl: Duration,
    /// Wrong guesses allowed before the code is burned
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_attempts: 5,
        }
    }
}

/// Mocked checkout configuration.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutConfig {
    /// Simulated payment/order processing time
    pub processing_delay: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_millis(500),
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
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_env_or_default("STOREFRONT_API_URL", "http://127.0.0.1:3000/api");
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_API_URL".to_string(), e.to_string())
        })?;

        let api = ApiConfig {
            base_url,
            timeout: Duration::from_secs(get_parsed_env("STOREFRONT_HTTP_TIMEOUT_SECS", 10)?),
        };

        let loyalty = LoyaltyRules {
            coin_discount: get_decimal_env("STOREFRONT_COIN_DISCOUNT", Decimal::ONE_HUNDRED)?,
            earn_rate: get_decimal_env("STOREFRONT_COIN_EARN_RATE", Decimal::new(5, 2))?,
        };

        let otp = OtpConfig {
            ttl: Duration::from_secs(get_parsed_env("STOREFRONT_OTP_TTL_SECS", 300)?),
            ..OtpConfig::default()
        };

        let checkout = CheckoutConfig {
            processing_delay: Duration::from_millis(get_parsed_env(
                "STOREFRONT_CHECKOUT_DELAY_MS",
                500,
            )?),
        };

        Ok(Self {
            api,
            data_dir: PathBuf::from(get_env_or_default("STOREFRONT_DATA_DIR", ".bazaar")),
            currency: get_parsed_env("STOREFRONT_CURRENCY", CurrencyCode::default())?,
            loyalty,
            otp,
            checkout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a non-negative decimal environment variable.
fn get_decimal_env(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let value: Decimal = get_parsed_env(key, default)?;
    if value.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, unsafe_code)]
mod tests {
    use super::*;

    // Keys below are unique to each test so parallel tests don't interfere.

    #[test]
    fn test_parsed_env_default_when_unset() {
        let value: u64 = get_parsed_env("BAZAAR_TEST_UNSET_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parsed_env_invalid_value() {
        // SAFETY: test-only env mutation on a key no other test reads
        unsafe { std::env::set_var("BAZAAR_TEST_BAD_NUMBER", "ten") };
        let result: Result<u64, _> = get_parsed_env("BAZAAR_TEST_BAD_NUMBER", 1);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "BAZAAR_TEST_BAD_NUMBER"));
    }

    #[test]
    fn test_blank_env_counts_as_unset() {
        // SAFETY: test-only env mutation on a key no other test reads
        unsafe { std::env::set_var("BAZAAR_TEST_BLANK", "   ") };
        assert_eq!(get_env_or_default("BAZAAR_TEST_BLANK", "fallback"), "fallback");
    }

    #[test]
    fn test_decimal_env_rejects_negative() {
        // SAFETY: test-only env mutation on a key no other test reads
        unsafe { std::env::set_var("BAZAAR_TEST_NEGATIVE_DECIMAL", "-5") };
        assert!(get_decimal_env("BAZAAR_TEST_NEGATIVE_DECIMAL", Decimal::ONE).is_err());
    }

    #[test]
    fn test_currency_parses_from_env() {
        // SAFETY: test-only env mutation on a key no other test reads
        unsafe { std::env::set_var("BAZAAR_TEST_CURRENCY", "inr") };
        let currency: CurrencyCode =
            get_parsed_env("BAZAAR_TEST_CURRENCY", CurrencyCode::USD).unwrap();
        assert_eq!(currency, CurrencyCode::INR);
    }
}
