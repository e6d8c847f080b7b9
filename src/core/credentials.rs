//! Secure token storage using the system keyring
//!
//! Stores the GitHub access token obtained from `z2r auth login` under a
//! fixed key, together with its expiry and scope. Tokens live for one day
//! and are never refreshed; an expired token is treated as absent.
//!
//! Uses the system keyring (macOS Keychain, Linux Secret Service) with an
//! in-memory cache to minimize keychain prompts.
//!
//! ## Environment Variable Fallback
//!
//! For development and CI, `GITHUB_TOKEN` overrides the stored token.
//!
//! Priority: env var > cache > keyring

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use keyring::Entry;
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, Zip2RepoError};
use crate::github::auth::AccessToken;

const SERVICE_NAME: &str = "zip2repo";
const GITHUB_TOKEN_KEY: &str = "github_token";

const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Lifetime given to tokens whose expiry the proxy did not report
pub const TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

// Option<Option<T>>:
//   - None = not yet fetched from keyring
//   - Some(None) = fetched, but no credential exists
//   - Some(Some(value)) = fetched and cached
static GITHUB_TOKEN_CACHE: Lazy<RwLock<Option<Option<AccessToken>>>> =
    Lazy::new(|| RwLock::new(None));

/// Serializable format for keyring storage
///
/// Uses plain strings since SecretString doesn't implement Serialize.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredToken {
    /// The access token
    pub access_token: String,
    /// ISO 8601 expiry timestamp
    pub expires_at: String,
    /// Granted scopes
    pub scope: String,
    /// Version for future migrations
    pub version: u8,
}

impl StoredToken {
    /// Convert a token to its storable form
    pub fn from_token(token: &AccessToken) -> Self {
        Self {
            access_token: token.value.expose_secret().to_string(),
            expires_at: token.expires_at.to_rfc3339(),
            scope: token.scope.clone(),
            version: 1,
        }
    }

    /// Restore the token after keyring retrieval
    pub fn into_token(self) -> Result<AccessToken> {
        let expires_at = DateTime::parse_from_rfc3339(&self.expires_at)
            .map_err(|e| Zip2RepoError::Config(format!("Invalid token expiration date: {}", e)))?
            .with_timezone(&Utc);

        Ok(AccessToken {
            value: SecretString::from(self.access_token),
            expires_at,
            scope: self.scope,
        })
    }
}

/// Credential store for the GitHub access token
pub struct CredentialStore;

impl CredentialStore {
    /// Store the access token securely
    ///
    /// Updates both the keyring and the in-memory cache.
    pub fn store_token(token: &AccessToken) -> Result<()> {
        let json = serde_json::to_string(&StoredToken::from_token(token))
            .map_err(|e| Zip2RepoError::Config(format!("Failed to serialize token: {}", e)))?;

        let entry = Entry::new(SERVICE_NAME, GITHUB_TOKEN_KEY)?;
        entry.set_password(&json)?;

        if let Ok(mut cache) = GITHUB_TOKEN_CACHE.write() {
            *cache = Some(Some(token.clone()));
        }

        Ok(())
    }

    /// Retrieve the stored token, expired or not
    ///
    /// Priority: cache > keyring. The env override is handled by
    /// [`crate::core::TokenManager`].
    pub fn get_token() -> Result<Option<AccessToken>> {
        if let Ok(cache) = GITHUB_TOKEN_CACHE.read() {
            if let Some(cached) = cache.as_ref() {
                return Ok(cached.clone());
            }
        }

        let result = Self::fetch_token_from_keyring()?;

        if let Ok(mut cache) = GITHUB_TOKEN_CACHE.write() {
            *cache = Some(result.clone());
        }

        Ok(result)
    }

    fn fetch_token_from_keyring() -> Result<Option<AccessToken>> {
        let entry = Entry::new(SERVICE_NAME, GITHUB_TOKEN_KEY)?;
        match entry.get_password() {
            Ok(json) => {
                let stored: StoredToken = serde_json::from_str(&json)
                    .map_err(|e| Zip2RepoError::Config(format!("Invalid stored token: {}", e)))?;
                Ok(Some(stored.into_token()?))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Zip2RepoError::Credential(format!(
                "Cannot access system keychain. Make sure your keyring is unlocked. ({})",
                e
            ))),
        }
    }

    /// Delete the stored token
    ///
    /// Clears both the keyring and the in-memory cache.
    pub fn delete_token() -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, GITHUB_TOKEN_KEY)?;
        let result = match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(Zip2RepoError::Credential(e.to_string())),
        };

        if let Ok(mut cache) = GITHUB_TOKEN_CACHE.write() {
            *cache = Some(None);
        }

        result
    }

    /// Check if an unexpired token is stored
    pub fn has_token() -> Result<bool> {
        Ok(Self::get_token()?.is_some_and(|token| !Self::is_token_expired(&token)))
    }

    /// Environment override, if set and non-empty
    pub fn env_token() -> Option<SecretString> {
        std::env::var(GITHUB_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }

    /// Check if a token has passed its expiry
    pub fn is_token_expired(token: &AccessToken) -> bool {
        Utc::now() >= token.expires_at
    }

    /// Get a masked version of a token for display (shows first 4 and last 4 chars)
    pub fn mask_token(token: &SecretString) -> String {
        let exposed = token.expose_secret();
        if exposed.len() <= 8 {
            "*".repeat(exposed.len())
        } else {
            format!("{}...{}", &exposed[..4], &exposed[exposed.len() - 4..])
        }
    }
}
