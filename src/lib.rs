//! zip2repo - publish a ZIP archive as a new GitHub repository
//!
//! This library provides the OAuth login handshake, a token-bucket rate
//! limiter and the upload pipeline that turns archive entries into
//! repository files, plus the CLI built on top of them.

pub mod cli;
pub mod core;
pub mod error;
pub mod github;

pub use error::{Result, Zip2RepoError};
