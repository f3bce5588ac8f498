//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `SIDEQUEST_API_BASE_URL` - Backend origin; `/api` is appended (default: `http://localhost:5000`)
//! - `SIDEQUEST_TIMEOUT_MS` - Default per-request timeout (default: 10000)
//! - `SIDEQUEST_QUEST_TIMEOUT_MS` - Timeout for the quest of the day (default: 15000)
//! - `SIDEQUEST_IDENTITY_FILE` - File the debug identity is persisted to (default: `.sidequest-identity`)
//! - `SIDEQUEST_DEFAULT_RADIUS_KM` - Radius offered when the profile has none (default: 2)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_QUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_IDENTITY_FILE: &str = ".sidequest-identity";
const DEFAULT_RADIUS_KM: f64 = 2.0;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// SideQuest client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without the `/api` suffix
    pub api_base_url: Url,
    /// Default timeout for profile, status and mutation calls
    pub timeout: Duration,
    /// Timeout for `GET /quests/today`, which may trigger quest generation
    pub quest_timeout: Duration,
    /// Where the debug identity is persisted between runs
    pub identity_file: PathBuf,
    /// Radius offered by the location card when the profile has none
    pub default_radius_km: f64,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base = get("SIDEQUEST_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(base.trim()).map_err(|e| {
            ConfigError::InvalidEnvVar("SIDEQUEST_API_BASE_URL".to_string(), e.to_string())
        })?;
        if api_base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "SIDEQUEST_API_BASE_URL".to_string(),
                "must be an http(s) origin".to_string(),
            ));
        }

        let timeout = parse_millis(get("SIDEQUEST_TIMEOUT_MS"), "SIDEQUEST_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let quest_timeout = parse_millis(
            get("SIDEQUEST_QUEST_TIMEOUT_MS"),
            "SIDEQUEST_QUEST_TIMEOUT_MS",
            DEFAULT_QUEST_TIMEOUT_MS,
        )?;

        let identity_file = get("SIDEQUEST_IDENTITY_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_IDENTITY_FILE), PathBuf::from);

        let default_radius_km = match get("SIDEQUEST_DEFAULT_RADIUS_KM") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|radius| radius.is_finite() && *radius > 0.0)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "SIDEQUEST_DEFAULT_RADIUS_KM".to_string(),
                        format!("expected a positive number, got {raw:?}"),
                    )
                })?,
            None => DEFAULT_RADIUS_KM,
        };

        Ok(Self {
            api_base_url,
            timeout,
            quest_timeout,
            identity_file,
            default_radius_km,
        })
    }

    /// Root of every API path, e.g. `http://localhost:5000/api`.
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}/api", self.api_base_url.as_str().trim_end_matches('/'))
    }
}

fn parse_millis(raw: Option<String>, key: &str, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_millis(default));
    };
    let millis = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if millis == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "timeout must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_millis(millis))
}
