//! Application configuration management
//!
//! Handles loading and saving application settings including:
//! - OAuth app and exchange proxy endpoints
//! - GitHub API base URL
//! - Upload pacing (rate limit and settle delay)

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::rate_limiter::RateLimiter;
use crate::error::{Result, Zip2RepoError};

/// Default loopback redirect used by `z2r auth login`
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:18484/callback";

/// Default location of the code exchange proxy
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:5173/api/auth/github";

/// Default GitHub REST API base
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Longest accepted rate limit window (one day)
pub const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth App client ID (public; the secret stays with the proxy)
    pub client_id: Option<String>,

    /// Redirect URI registered with the OAuth App
    pub redirect_uri: String,

    /// Backend endpoint that exchanges authorization codes for tokens
    pub proxy_url: String,

    /// GitHub REST API base URL
    pub api_base: String,

    /// Token bucket size
    pub rate_limit_capacity: u32,

    /// Tokens added per window
    pub rate_limit_refill: u32,

    /// Refill window in seconds
    pub rate_limit_window_secs: u64,

    /// Wait after repository creation before the first write
    pub settle_delay_ms: u64,

    /// How long `auth login` waits for the browser callback
    pub callback_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            rate_limit_capacity: 5000,
            rate_limit_refill: 5000,
            rate_limit_window_secs: 60,
            settle_delay_ms: 2000,
            callback_timeout_secs: 300,
        }
    }
}

/// Keys editable through `z2r config`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    ClientId,
    RedirectUri,
    ProxyUrl,
    ApiBase,
    RateLimitCapacity,
    RateLimitRefill,
    RateLimitWindowSecs,
    SettleDelayMs,
    CallbackTimeoutSecs,
}

impl Config {
    /// Load configuration from file, or create default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "zip2repo", "zip2repo")
            .ok_or_else(|| Zip2RepoError::Config("Could not determine config directory".into()))?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Rate limiter built from the configured bucket
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit_capacity,
            self.rate_limit_refill,
            Duration::from_secs(self.rate_limit_window_secs),
        )
    }

    /// Delay between repository creation and the first upload
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Maximum wait for the OAuth callback
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    /// Read a field as display text
    pub fn get(&self, field: ConfigField) -> String {
        match field {
            ConfigField::ClientId => self.client_id.clone().unwrap_or_default(),
            ConfigField::RedirectUri => self.redirect_uri.clone(),
            ConfigField::ProxyUrl => self.proxy_url.clone(),
            ConfigField::ApiBase => self.api_base.clone(),
            ConfigField::RateLimitCapacity => self.rate_limit_capacity.to_string(),
            ConfigField::RateLimitRefill => self.rate_limit_refill.to_string(),
            ConfigField::RateLimitWindowSecs => self.rate_limit_window_secs.to_string(),
            ConfigField::SettleDelayMs => self.settle_delay_ms.to_string(),
            ConfigField::CallbackTimeoutSecs => self.callback_timeout_secs.to_string(),
        }
    }

    /// Parse and set a field
    pub fn set(&mut self, field: ConfigField, value: &str) -> Result<()> {
        match field {
            ConfigField::ClientId => self.client_id = Some(value.to_string()),
            ConfigField::RedirectUri => self.redirect_uri = parse_url(value)?,
            ConfigField::ProxyUrl => self.proxy_url = parse_url(value)?,
            ConfigField::ApiBase => self.api_base = parse_url(value)?,
            ConfigField::RateLimitCapacity => self.rate_limit_capacity = parse_number(value)?,
            ConfigField::RateLimitRefill => self.rate_limit_refill = parse_number(value)?,
            ConfigField::RateLimitWindowSecs => {
                self.rate_limit_window_secs = parse_window_secs(value)?
            }
            ConfigField::SettleDelayMs => self.settle_delay_ms = parse_number(value)?,
            ConfigField::CallbackTimeoutSecs => self.callback_timeout_secs = parse_number(value)?,
        }
        Ok(())
    }

    /// Reset a field to its default
    pub fn reset(&mut self, field: ConfigField) {
        let defaults = Config::default();
        match field {
            ConfigField::ClientId => self.client_id = defaults.client_id,
            ConfigField::RedirectUri => self.redirect_uri = defaults.redirect_uri,
            ConfigField::ProxyUrl => self.proxy_url = defaults.proxy_url,
            ConfigField::ApiBase => self.api_base = defaults.api_base,
            ConfigField::RateLimitCapacity => self.rate_limit_capacity = defaults.rate_limit_capacity,
            ConfigField::RateLimitRefill => self.rate_limit_refill = defaults.rate_limit_refill,
            ConfigField::RateLimitWindowSecs => {
                self.rate_limit_window_secs = defaults.rate_limit_window_secs
            }
            ConfigField::SettleDelayMs => self.settle_delay_ms = defaults.settle_delay_ms,
            ConfigField::CallbackTimeoutSecs => {
                self.callback_timeout_secs = defaults.callback_timeout_secs
            }
        }
    }
}

fn parse_url(value: &str) -> Result<String> {
    url::Url::parse(value)
        .map_err(|e| Zip2RepoError::InvalidInput(format!("Invalid URL '{}': {}", value, e)))?;
    Ok(value.to_string())
}

fn parse_window_secs(value: &str) -> Result<u64> {
    let secs: u64 = parse_number(value)?;
    if !(1..=MAX_RATE_LIMIT_WINDOW_SECS).contains(&secs) {
        return Err(Zip2RepoError::InvalidInput(format!(
            "Rate limit window must be between 1 and {} seconds, got {}",
            MAX_RATE_LIMIT_WINDOW_SECS, secs
        )));
    }
    Ok(secs)
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Zip2RepoError::InvalidInput(format!("Expected a number, got '{}'", value)))
}
