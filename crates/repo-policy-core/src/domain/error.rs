//! Error taxonomy for repository scanning.

use std::time::Duration;

use crate::oracle::OracleError;

/// Errors produced when an [`AccessRecord`](super::AccessRecord) or one of its
/// permission entries violates a shape invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("permission entry username must not be empty")]
    EmptyUsername,

    #[error("team permission source requires a non-empty slug")]
    EmptyTeamSlug,

    #[error("unrecognized permission source: {0}")]
    InvalidSource(String),

    #[error("repository name must not be empty")]
    MissingName,
}

/// Failures talking to the source-control provider.
///
/// Per-repository fetch failures are recovered by the builder; only a failure
/// to list the organization itself escapes as a [`ScanError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("provider returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("provider rate limit exhausted (resets at {reset})")]
    RateLimited { reset: String },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

/// Policy-level failure of a scan: nothing per-repository could be decided.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("failed to list repositories for {org}: {source}")]
    ListRepositories {
        org: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("scan timed out after {0:?}")]
    Timeout(Duration),

    #[error("scan transport error: {0}")]
    Transport(String),

    /// Error text reported verbatim by a remote scanner.
    #[error("{0}")]
    Remote(String),
}
