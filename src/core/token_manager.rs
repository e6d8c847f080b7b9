//! Access token lookup for API calls
//!
//! ## Token Priority
//!
//! 1. Environment variable (`GITHUB_TOKEN`) - assumed valid
//! 2. Stored token from `z2r auth login`, if not yet expired
//!
//! Tokens are never refreshed. An expired stored token is removed and the
//! user is asked to log in again.

use secrecy::SecretString;

use crate::core::credentials::CredentialStore;
use crate::error::{Result, Zip2RepoError};

/// Token manager for obtaining a usable access token
pub struct TokenManager;

impl TokenManager {
    /// Get a valid access token
    ///
    /// ## Errors
    ///
    /// - `NotAuthenticated` - No token available
    /// - `TokenExpired` - The stored token has passed its expiry
    pub fn get_valid_token() -> Result<SecretString> {
        if let Some(token) = CredentialStore::env_token() {
            return Ok(token);
        }

        match CredentialStore::get_token()? {
            Some(token) if !CredentialStore::is_token_expired(&token) => Ok(token.value),
            Some(_) => {
                tracing::debug!("stored token expired, removing it");
                let _ = CredentialStore::delete_token();
                Err(Zip2RepoError::TokenExpired)
            }
            None => Err(Zip2RepoError::NotAuthenticated),
        }
    }
}
