//! GitHub API error detection and classification
//!
//! Turns octocrab errors into the stage-specific errors of the upload
//! pipeline and into actionable messages for everything else.

use std::process::Command;

use crate::error::{RepoError, Zip2RepoError};

/// HTTP status GitHub reports for validation failures (e.g. name taken)
const STATUS_UNPROCESSABLE: u16 = 422;
const STATUS_NOT_FOUND: u16 = 404;

/// HTTP status of a GitHub error response, if the error carries one
pub fn status_code(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Whether the error is a 404 from GitHub
pub fn is_not_found(err: &octocrab::Error) -> bool {
    status_code(err) == Some(STATUS_NOT_FOUND)
}

/// One-line description of a GitHub error, including status and message
pub fn describe_github_error(err: &octocrab::Error) -> String {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            format!("{} ({})", source.message, source.status_code)
        }
        // Display only returns the variant name for some errors
        other => format!("{:?}", other),
    }
}

/// Classify a failed repository creation
///
/// GitHub answers 422 when the name is taken or does not pass validation.
pub fn classify_create_error(name: &str, err: octocrab::Error) -> RepoError {
    if status_code(&err) == Some(STATUS_UNPROCESSABLE) {
        tracing::debug!(name, "repository name rejected");
        return RepoError::NameConflict(name.to_string());
    }
    RepoError::CreateFailed(describe_github_error(&err))
}

/// Classifies an octocrab error outside the upload pipeline
pub fn classify_github_error(err: octocrab::Error) -> Zip2RepoError {
    let error_message = describe_github_error(&err);

    if status_code(&err) == Some(401) {
        return Zip2RepoError::GitHubApi(
            "Bad credentials. Your token may have been revoked.".to_string(),
        );
    }

    if is_rate_limit_error(&error_message) {
        return Zip2RepoError::GitHubApi(
            "API rate limit exceeded. Please wait a few minutes and try again.".to_string(),
        );
    }

    Zip2RepoError::GitHubApi(error_message)
}

/// Check if error is a rate limit error
fn is_rate_limit_error(error_message: &str) -> bool {
    error_message.contains("rate limit")
        || (error_message.contains("403") && error_message.contains("limit exceeded"))
}

/// Attempt to open a URL in the default browser
///
/// Returns true if the browser was successfully launched, false otherwise.
#[allow(unused_variables)]
pub fn open_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .is_ok()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limit_error("API rate limit exceeded"));
        assert!(is_rate_limit_error("403 limit exceeded"));
        assert!(!is_rate_limit_error("Some other error"));
    }
}
