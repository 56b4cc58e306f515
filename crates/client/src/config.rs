//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `GROCERYAID_API_ORIGIN` - Origin of the REST API (default: `http://localhost`)
//! - `GROCERYAID_API_TIMEOUT_MS` - Request timeout in milliseconds (default: 1000)
//! - `GROCERYAID_CACHE_TTL_SECS` - Lifetime of cached stores and products
//!   (default: 300, `0` disables the cache)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_ORIGIN: &str = "http://localhost";
const DEFAULT_TIMEOUT_MS: &str = "1000";
const DEFAULT_CACHE_TTL_SECS: &str = "300";

/// Version prefix of every API path.
pub const API_PREFIX: &str = "/api/v1";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Grocery Aid configuration.
#[derive(Debug, Clone)]
pub struct GroceryAidConfig {
    /// REST API configuration
    pub api: ApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// REST API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme, host and port of the API (e.g. `http://localhost:8000`)
    pub origin: Url,
    /// Timeout for a single request
    pub timeout: Duration,
    /// Lifetime of cached stores and products; zero disables caching
    pub cache_ttl: Duration,
}

impl GroceryAidConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            api: ApiConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    /// Configuration for the API at `origin` with default timeout and cache.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `origin` is not an http(s) URL.
    pub fn for_origin(origin: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            origin: parse_origin("origin", origin)?,
            timeout: Duration::from_millis(parse_u64("timeout", DEFAULT_TIMEOUT_MS)?),
            cache_ttl: Duration::from_secs(parse_u64("cache_ttl", DEFAULT_CACHE_TTL_SECS)?),
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let origin = parse_origin(
            "GROCERYAID_API_ORIGIN",
            &get_env_or_default("GROCERYAID_API_ORIGIN", DEFAULT_API_ORIGIN),
        )?;
        let timeout_ms = parse_u64(
            "GROCERYAID_API_TIMEOUT_MS",
            &get_env_or_default("GROCERYAID_API_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GROCERYAID_API_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let cache_ttl_secs = parse_u64(
            "GROCERYAID_CACHE_TTL_SECS",
            &get_env_or_default("GROCERYAID_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        )?;

        Ok(Self {
            origin,
            timeout: Duration::from_millis(timeout_ms),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    /// Base URL of the versioned API, without a trailing slash.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}{API_PREFIX}", self.origin.as_str().trim_end_matches('/'))
    }

    /// Returns a copy with caching disabled.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache_ttl = Duration::ZERO;
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an API origin, accepting only http and https URLs.
fn parse_origin(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {:?} (expected http or https)", url.scheme()),
        ));
    }
    Ok(url)
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_origin_defaults() {
        let config = ApiConfig::for_origin("http://localhost:8000").unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_api_base() {
        let config = ApiConfig::for_origin("http://localhost:8000").unwrap();
        assert_eq!(config.api_base(), "http://localhost:8000/api/v1");

        let config = ApiConfig::for_origin("https://groceries.example/").unwrap();
        assert_eq!(config.api_base(), "https://groceries.example/api/v1");
    }

    #[test]
    fn test_origin_rejects_other_schemes() {
        let result = ApiConfig::for_origin("ftp://localhost");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_origin_rejects_garbage() {
        assert!(ApiConfig::for_origin("not a url").is_err());
    }

    #[test]
    fn test_without_cache() {
        let config = ApiConfig::for_origin("http://localhost").unwrap().without_cache();
        assert_eq!(config.cache_ttl, Duration::ZERO);
    }

    #[test]
    fn test_parse_u64_error_names_variable() {
        let err = parse_u64("GROCERYAID_API_TIMEOUT_MS", "soon").unwrap_err();
        assert!(err.to_string().contains("GROCERYAID_API_TIMEOUT_MS"));
    }
}
