//! Configuration system (layered: code > env > defaults).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::poller::{DEFAULT_MAX_POLL_DURATION, DEFAULT_POLL_INTERVAL};
use crate::auth::{FileKeyValueStorage, KeyValueStorage, PollerConfig};
use crate::error::FishchiError;

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:5000/api/v1";
pub const DEFAULT_LOGIN_PAGE_URL: &str = "https://localhost:3000/login";

/// Endpoints, polling policy and storage location for the panel core.
///
/// # Example
/// ```
/// use fishchi::config::FishchiConfig;
///
/// let config = FishchiConfig::new().with_api_base_url("https://api.example.com/v1")?;
/// assert_eq!(config.auth_base_url(), "https://api.example.com/v1/auth");
/// # Ok::<(), fishchi::error::FishchiError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishchiConfig {
    api_base_url: String,
    auth_base_url: Option<String>,
    login_page_url: String,
    pub poll_interval: Duration,
    pub max_poll_duration: Duration,
    pub abort_on_network_error: bool,
    pub storage_dir: PathBuf,
}

impl Default for FishchiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FishchiConfig {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: None,
            login_page_url: DEFAULT_LOGIN_PAGE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: DEFAULT_MAX_POLL_DURATION,
            abort_on_network_error: true,
            storage_dir: default_fishchi_dir(),
        }
    }

    /// Load from environment variables, reading `.env` first if present.
    ///
    /// Recognized: `FISHCHI_API_BASE_URL`, `FISHCHI_AUTH_BASE_URL`,
    /// `FISHCHI_LOGIN_PAGE_URL`, `FISHCHI_POLL_INTERVAL_MS`,
    /// `FISHCHI_MAX_POLL_SECS`, `FISHCHI_ABORT_ON_NETWORK_ERROR`, `FISHCHI_HOME`.
    pub fn from_env() -> Result<Self, FishchiError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FishchiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::new();

        if let Some(url) = get("FISHCHI_API_BASE_URL") {
            config = config.with_api_base_url(url)?;
        }
        if let Some(url) = get("FISHCHI_AUTH_BASE_URL") {
            config = config.with_auth_base_url(url)?;
        }
        if let Some(url) = get("FISHCHI_LOGIN_PAGE_URL") {
            config = config.with_login_page_url(url)?;
        }
        if let Some(ms) = get("FISHCHI_POLL_INTERVAL_MS") {
            let ms = parse_positive("FISHCHI_POLL_INTERVAL_MS", &ms)?;
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = get("FISHCHI_MAX_POLL_SECS") {
            let secs = parse_positive("FISHCHI_MAX_POLL_SECS", &secs)?;
            config.max_poll_duration = Duration::from_secs(secs);
        }
        if let Some(flag) = get("FISHCHI_ABORT_ON_NETWORK_ERROR") {
            config.abort_on_network_error = parse_bool("FISHCHI_ABORT_ON_NETWORK_ERROR", &flag)?;
        }
        if let Some(dir) = get("FISHCHI_HOME") {
            config.storage_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Result<Self, FishchiError> {
        self.api_base_url = validate_url("api base URL", url.into())?;
        Ok(self)
    }

    pub fn with_auth_base_url(mut self, url: impl Into<String>) -> Result<Self, FishchiError> {
        self.auth_base_url = Some(validate_url("auth base URL", url.into())?);
        Ok(self)
    }

    pub fn with_login_page_url(mut self, url: impl Into<String>) -> Result<Self, FishchiError> {
        self.login_page_url = validate_url("login page URL", url.into())?;
        Ok(self)
    }

    pub fn with_storage_dir(mut self, dir: PathBuf) -> Self {
        self.storage_dir = dir;
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Explicit auth base, or `{api_base_url}/auth`.
    pub fn auth_base_url(&self) -> String {
        self.auth_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth", self.api_base_url))
    }

    pub fn login_page_url(&self) -> &str {
        &self.login_page_url
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            max_duration: self.max_poll_duration,
            abort_on_network_error: self.abort_on_network_error,
        }
    }

    /// Host-persistent storage rooted at `storage_dir`.
    pub fn storage(&self) -> Arc<dyn KeyValueStorage> {
        Arc::new(FileKeyValueStorage::new(self.storage_dir.clone()))
    }
}

fn validate_url(what: &str, url: String) -> Result<String, FishchiError> {
    let trimmed = url.trim().trim_end_matches('/');
    match reqwest::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        Ok(parsed) => Err(FishchiError::Configuration(format!(
            "{what} must use http or https, got {}",
            parsed.scheme()
        ))),
        Err(e) => Err(FishchiError::Configuration(format!(
            "invalid {what} {trimmed:?}: {e}"
        ))),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, FishchiError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FishchiError::Configuration(format!(
            "{key} must be a positive integer, got {value:?}"
        ))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, FishchiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FishchiError::Configuration(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

fn default_fishchi_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".fishchi"))
        .unwrap_or_else(|| PathBuf::from(".fishchi"))
}
