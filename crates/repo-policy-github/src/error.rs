//! Error types for the GitHub provider

use thiserror::Error;

/// Errors raised while setting up a [`GitHubClient`](crate::GitHubClient).
///
/// Request failures are reported as [`repo_policy_core::FetchError`].
#[derive(Error, Debug)]
pub enum GitHubError {
    /// No API token configured
    #[error("GitHub token must not be empty")]
    MissingToken,

    /// Token contains bytes that cannot go in a header
    #[error("GitHub token is not a valid header value")]
    InvalidToken,

    /// HTTP client construction failed
    #[error("failed to build HTTP client: {0}")]
    Http(String),
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        GitHubError::Http(err.to_string())
    }
}
