//! Core functionality for zip2repo
//!
//! This module contains shared building blocks including:
//! - Archive enumeration
//! - API rate limiting
//! - Credential management
//! - Token lookup
//! - Application configuration

pub mod archive;
pub mod config;
pub mod credentials;
pub mod rate_limiter;
pub mod token_manager;

pub use archive::{ArchiveEntry, ArchiveReader};
pub use config::Config;
pub use credentials::CredentialStore;
pub use rate_limiter::RateLimiter;
pub use token_manager::TokenManager;
