//! GitHub integration module
//!
//! This module provides all GitHub-related functionality:
//! - OAuth authorization-code handshake
//! - Loopback callback server
//! - Repository and contents API client
//! - Rate-limited archive upload
//! - Error classification

pub mod auth;
pub mod callback;
pub mod client;
pub mod error_handler;
pub mod upload;

pub use auth::{AccessToken, HandshakeStage, OAuthExchanger, OAuthSettings};
pub use callback::{CallbackListener, CallbackResult, CallbackServer};
pub use client::{GitHubClient, RemoteRepoClient, RepoHandle, RepoSpec};
pub use error_handler::{classify_github_error, open_browser};
pub use upload::{UploadEvent, UploadOrchestrator, UploadSummary};
