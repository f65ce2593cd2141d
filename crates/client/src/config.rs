//! Client configuration.
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honored). Every variable has a default, so an empty environment gives a
//! client pointed at a local backend.
//!
//! # Environment Variables
//!
//! ## Connection
//! - `OFFICINE_API_URL` - Backend base URL (default: `http://localhost:8000`)
//! - `OFFICINE_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `OFFICINE_PAGE_SIZE` - Supplier list page size (default: 20)
//!
//! ## Session
//! - `OFFICINE_SESSION_PATH` - Session file (default: `$HOME/.officine/session.json`)
//!
//! ## PDF letterhead
//! - `OFFICINE_PHARMACY_NAME`, `OFFICINE_PHARMACY_ADDRESS`,
//!   `OFFICINE_PHARMACY_CITY`, `OFFICINE_PHARMACY_PHONE`,
//!   `OFFICINE_PHARMACY_EMAIL`
//!
//! ## Observability
//! - `OFFICINE_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry DSN for error tracking
//! - `SENTRY_ENVIRONMENT` - Environment name (e.g., "production", "staging")

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_PAGE_SIZE: &str = "20";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,
    pub session_path: PathBuf,
    pub http_timeout: Duration,
    pub page_size: u32,
    pub pharmacy: PharmacyInfo,
    pub json_logs: bool,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Letterhead printed on exported documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PharmacyInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
}

impl Default for PharmacyInfo {
    fn default() -> Self {
        Self {
            name: "Pharmacie Centrale".to_owned(),
            address: "123 Rue de la Santé".to_owned(),
            city: "75001 Paris, France".to_owned(),
            phone: "Tél: 01 23 45 67 89".to_owned(),
            email: "Email: contact@pharmacie.fr".to_owned(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = normalize_base_url(
            "OFFICINE_API_URL",
            &get_env_or_default("OFFICINE_API_URL", DEFAULT_API_URL),
        )?;
        let http_timeout = get_env_or_default("OFFICINE_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("OFFICINE_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        let page_size = get_env_or_default("OFFICINE_PAGE_SIZE", DEFAULT_PAGE_SIZE)
            .parse::<u32>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "OFFICINE_PAGE_SIZE".to_string(),
                    "expected a positive integer".to_string(),
                )
            })?;
        let session_path = get_optional_env("OFFICINE_SESSION_PATH")
            .map_or_else(default_session_path, PathBuf::from);

        Ok(Self {
            api_url,
            session_path,
            http_timeout,
            page_size,
            pharmacy: PharmacyInfo::from_env(),
            json_logs: get_optional_env("OFFICINE_LOG_FORMAT")
                .is_some_and(|format| format.eq_ignore_ascii_case("json")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Defaults for everything but the backend URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not an absolute http(s) URL.
    pub fn for_base_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_base_url("api_url", api_url)?,
            session_path: default_session_path(),
            http_timeout: Duration::from_secs(30),
            page_size: 20,
            pharmacy: PharmacyInfo::default(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

impl PharmacyInfo {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: get_optional_env("OFFICINE_PHARMACY_NAME").unwrap_or(defaults.name),
            address: get_optional_env("OFFICINE_PHARMACY_ADDRESS").unwrap_or(defaults.address),
            city: get_optional_env("OFFICINE_PHARMACY_CITY").unwrap_or(defaults.city),
            phone: get_optional_env("OFFICINE_PHARMACY_PHONE").unwrap_or(defaults.phone),
            email: get_optional_env("OFFICINE_PHARMACY_EMAIL").unwrap_or(defaults.email),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn default_session_path() -> PathBuf {
    get_optional_env("HOME").map_or_else(
        || PathBuf::from(".officine").join("session.json"),
        |home| PathBuf::from(home).join(".officine").join("session.json"),
    )
}

/// Check that `value` is an absolute http(s) URL and strip trailing slashes.
pub(crate) fn normalize_base_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar(key.to_string(), reason);
    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(value.trim().trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("k", "http://localhost:8000/").unwrap(),
            "http://localhost:8000"
        );
        assert_eq!(
            normalize_base_url("k", " https://api.officine.dz ").unwrap(),
            "https://api.officine.dz"
        );
        assert!(normalize_base_url("k", "localhost:8000").is_err());
        assert!(normalize_base_url("k", "ftp://files.example").is_err());
        assert!(normalize_base_url("k", "").is_err());
    }

    #[test]
    fn test_for_base_url_defaults() {
        let config = ClientConfig::for_base_url("http://127.0.0.1:9000/").unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.pharmacy.name, "Pharmacie Centrale");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_default_letterhead() {
        let pharmacy = PharmacyInfo::default();
        assert_eq!(pharmacy.city, "75001 Paris, France");
        assert!(pharmacy.email.starts_with("Email: "));
    }
}
