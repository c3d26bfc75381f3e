//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `THREADLINE_API_BASE_URL` - Base URL of the backend REST API
//!
//! ## Optional
//! - `THREADLINE_CREDENTIALS_PATH` - Credential file (default: `.threadline/credentials.json`)
//! - `THREADLINE_REFRESH_PATH` - Token refresh endpoint (default: `/auth/refresh-token`)
//! - `THREADLINE_REFRESH_TIMEOUT_SECS` - Refresh call timeout (default: 10)
//! - `THREADLINE_EXPIRY_NOTICE_DELAY_MS` - Delay before announcing an expired session (default: 1000)
//! - `THREADLINE_LOGIN_ROUTE` - Login entry point announced on expiry (default: `/login`)
//! - `THREADLINE_CATALOG_TTL_SECS` - Product list cache lifetime (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_CREDENTIALS_PATH: &str = ".threadline/credentials.json";
const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EXPIRY_NOTICE_DELAY_MS: u64 = 1000;
const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration shared by both fronts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is resolved against
    pub base_url: Url,
    /// Where the credential store keeps its JSON file
    pub credentials_path: PathBuf,
    /// Token refresh settings
    pub refresh: RefreshPolicy,
    /// How long the storefront keeps the product list
    pub catalog_ttl: Duration,
}

/// Settings governing the token refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Path of the refresh endpoint
    pub refresh_path: String,
    /// Upper bound for a single refresh call
    pub timeout: Duration,
    /// Pause between a failed refresh and the `Expired` event
    pub expiry_notice_delay: Duration,
    /// Login entry point carried by the `Expired` event
    pub login_route: String,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
            expiry_notice_delay: Duration::from_millis(DEFAULT_EXPIRY_NOTICE_DELAY_MS),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            refresh: RefreshPolicy::default(),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is missing or any variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("THREADLINE_API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("THREADLINE_API_BASE_URL".to_string()))?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("THREADLINE_API_BASE_URL".to_string(), e.to_string())
        })?;

        let credentials_path = lookup("THREADLINE_CREDENTIALS_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH), PathBuf::from);

        let refresh = RefreshPolicy {
            refresh_path: lookup("THREADLINE_REFRESH_PATH")
                .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string()),
            timeout: Duration::from_secs(parse_or_default(
                &lookup,
                "THREADLINE_REFRESH_TIMEOUT_SECS",
                DEFAULT_REFRESH_TIMEOUT_SECS,
            )?),
            expiry_notice_delay: Duration::from_millis(parse_or_default(
                &lookup,
                "THREADLINE_EXPIRY_NOTICE_DELAY_MS",
                DEFAULT_EXPIRY_NOTICE_DELAY_MS,
            )?),
            login_route: lookup("THREADLINE_LOGIN_ROUTE")
                .unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_string()),
        };

        if refresh.timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "THREADLINE_REFRESH_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let catalog_ttl = Duration::from_secs(parse_or_default(
            &lookup,
            "THREADLINE_CATALOG_TTL_SECS",
            DEFAULT_CATALOG_TTL_SECS,
        )?);

        Ok(Self {
            base_url,
            credentials_path,
            refresh,
            catalog_ttl,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional numeric variable, falling back to `default`.
fn parse_or_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
