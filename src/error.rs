//! Custom error types for zip2repo
//!
//! User-friendly error messages for all failure scenarios. Each stage of a
//! run (authentication, repository creation, file upload) has its own error
//! enum so callers can tell which stage failed.

use thiserror::Error;

/// Failures of the OAuth authorization-code handshake
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The callback's state did not match the last issued, unconsumed nonce
    #[error("The authorization callback carried an unexpected state value.\n\n  → This can indicate a forged or replayed callback. Run 'z2r auth login' again.")]
    StateMismatch,

    /// The backend proxy failed to exchange the code for a token
    #[error("Failed to exchange the authorization code for a token: {0}\n\n  → Check that the exchange proxy is running and reachable.")]
    ExchangeFailed(String),

    /// The handshake already reached a terminal stage
    #[error("This login attempt has already finished.\n\n  → Start a new login with 'z2r auth login'.")]
    HandshakeFinished,

    /// The user denied the authorization request on the provider
    #[error("Authorization was denied on GitHub.")]
    AccessDenied,

    /// No callback arrived in time
    #[error("Timed out waiting for the GitHub authorization callback.\n\n  → Run 'z2r auth login' again and approve the request in your browser.")]
    CallbackTimeout,

    /// The callback arrived without an authorization code
    #[error("The authorization callback did not include a code.")]
    MissingCode,

    /// The local callback listener failed
    #[error("OAuth callback listener failed: {0}")]
    Callback(String),
}

/// Failures creating the remote repository
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// The host rejected the name (already taken or invalid)
    #[error("Repository name '{0}' already exists or is invalid.\n\n  → Choose a different name.")]
    NameConflict(String),

    /// Any other failure of the create call
    #[error("Failed to create repository: {0}")]
    CreateFailed(String),
}

/// Failures uploading archive contents
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Reading or writing a single path failed; the run stopped there
    #[error("Failed to upload {path}: {cause}\n\n  → Files uploaded before this one are already in the repository.")]
    PathFailed {
        /// Archive path that failed
        path: String,
        /// Underlying cause
        cause: String,
    },
}

impl UploadError {
    /// Build a `PathFailed` error for `path`
    pub fn path_failed(path: impl Into<String>, cause: impl ToString) -> Self {
        UploadError::PathFailed {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Path that failed
    pub fn path(&self) -> &str {
        match self {
            UploadError::PathFailed { path, .. } => path,
        }
    }
}

/// Main error type for the zip2repo application
#[derive(Error, Debug)]
pub enum Zip2RepoError {
    /// Authentication handshake error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Repository creation error
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// File upload error
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// User is not authenticated
    #[error("You are not logged in to GitHub.\n\n  → Run 'z2r auth login' to authenticate.")]
    NotAuthenticated,

    /// Stored token has passed its expiry
    #[error("Your GitHub session has expired.\n\n  → Run 'z2r auth login' to authenticate again.")]
    TokenExpired,

    /// GitHub API error outside the upload pipeline
    #[error("GitHub API request failed: {0}\n\n  → Check your internet connection.\n  → Your token may have expired - try 'z2r auth logout' then 'z2r auth login'.")]
    GitHubApi(String),

    /// Archive could not be read
    #[error("Cannot read archive: {0}")]
    Archive(String),

    /// Credential storage error
    #[error("Cannot access secure storage: {0}\n\n  → On macOS: Make sure Keychain Access is available.\n  → On Linux: Ensure a secret service (like gnome-keyring) is running.")]
    Credential(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),
}

impl From<keyring::Error> for Zip2RepoError {
    fn from(err: keyring::Error) -> Self {
        Zip2RepoError::Credential(err.to_string())
    }
}

impl From<toml::de::Error> for Zip2RepoError {
    fn from(err: toml::de::Error) -> Self {
        Zip2RepoError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for Zip2RepoError {
    fn from(err: toml::ser::Error) -> Self {
        Zip2RepoError::Toml(err.to_string())
    }
}

impl From<zip::result::ZipError> for Zip2RepoError {
    fn from(err: zip::result::ZipError) -> Self {
        Zip2RepoError::Archive(err.to_string())
    }
}

impl From<octocrab::Error> for Zip2RepoError {
    fn from(err: octocrab::Error) -> Self {
        // Use the error handler to classify and provide actionable guidance
        crate::github::error_handler::classify_github_error(err)
    }
}

/// Result type alias using Zip2RepoError
pub type Result<T> = std::result::Result<T, Zip2RepoError>;
