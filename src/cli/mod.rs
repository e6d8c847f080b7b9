//! CLI module for zip2repo
//!
//! This module contains all CLI command definitions and handlers using clap.

pub mod auth;
pub mod commands;
pub mod config;
pub mod upload;

pub use commands::{Cli, Commands};
