//! CLI command definitions using clap
//!
//! Defines the command structure for the `z2r` CLI tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::config::{Config, ConfigField};
use crate::error::Result;

/// zip2repo - publish a ZIP archive as a new GitHub repository
#[derive(Parser, Debug)]
#[command(name = "z2r", version, about, long_about = None)]
pub struct Cli {
    /// Log progress details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with GitHub
    Auth(AuthArgs),

    /// Upload a ZIP archive into a new repository
    Upload(UploadArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Settings that take precedence over the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// OAuth App client ID
    #[arg(long, env = "ZIP2REPO_CLIENT_ID", global = true, hide_env_values = true)]
    pub client_id: Option<String>,

    /// Code exchange proxy endpoint
    #[arg(long, env = "ZIP2REPO_PROXY_URL", global = true)]
    pub proxy_url: Option<String>,
}

impl ConfigOverrides {
    /// Load the config file and apply these overrides on top
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load()?;
        if let Some(client_id) = &self.client_id {
            config.set(ConfigField::ClientId, client_id)?;
        }
        if let Some(proxy_url) = &self.proxy_url {
            config.set(ConfigField::ProxyUrl, proxy_url)?;
        }
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication commands
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Login to GitHub
    Login {
        /// Paste a Personal Access Token instead of using the browser flow
        #[arg(long)]
        pat: bool,
    },
    /// Logout and remove stored credentials
    Logout,
    /// Show current authentication status
    Status,
}

// ─────────────────────────────────────────────────────────────────────────────
// Upload Command
// ─────────────────────────────────────────────────────────────────────────────

/// Upload arguments
#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Path to the .zip archive
    pub archive: PathBuf,

    /// Name of the repository to create
    #[arg(long, short)]
    pub name: String,

    /// Repository description
    #[arg(long, short, default_value = "")]
    pub description: String,

    /// Create a private repository
    #[arg(long)]
    pub private: bool,

    /// Initialize the repository with a README
    #[arg(long)]
    pub readme: bool,

    /// Open the repository in the browser when done
    #[arg(long)]
    pub open: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },

    /// Reset a configuration value to its default
    Remove {
        /// Configuration key
        key: ConfigKey,
    },
}

/// Available configuration keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// OAuth App client ID
    #[value(name = "client-id")]
    ClientId,

    /// Redirect URI registered with the OAuth App
    #[value(name = "redirect-uri")]
    RedirectUri,

    /// Code exchange proxy endpoint
    #[value(name = "proxy-url")]
    ProxyUrl,

    /// GitHub REST API base URL
    #[value(name = "api-base")]
    ApiBase,

    /// Rate limiter bucket size
    #[value(name = "rate-limit-capacity")]
    RateLimitCapacity,

    /// Tokens added per window
    #[value(name = "rate-limit-refill")]
    RateLimitRefill,

    /// Refill window in seconds
    #[value(name = "rate-limit-window-secs")]
    RateLimitWindowSecs,

    /// Delay after repository creation, in milliseconds
    #[value(name = "settle-delay-ms")]
    SettleDelayMs,

    /// Login callback timeout in seconds
    #[value(name = "callback-timeout-secs")]
    CallbackTimeoutSecs,
}

impl From<ConfigKey> for ConfigField {
    fn from(key: ConfigKey) -> Self {
        match key {
            ConfigKey::ClientId => ConfigField::ClientId,
            ConfigKey::RedirectUri => ConfigField::RedirectUri,
            ConfigKey::ProxyUrl => ConfigField::ProxyUrl,
            ConfigKey::ApiBase => ConfigField::ApiBase,
            ConfigKey::RateLimitCapacity => ConfigField::RateLimitCapacity,
            ConfigKey::RateLimitRefill => ConfigField::RateLimitRefill,
            ConfigKey::RateLimitWindowSecs => ConfigField::RateLimitWindowSecs,
            ConfigKey::SettleDelayMs => ConfigField::SettleDelayMs,
            ConfigKey::CallbackTimeoutSecs => ConfigField::CallbackTimeoutSecs,
        }
    }
}
