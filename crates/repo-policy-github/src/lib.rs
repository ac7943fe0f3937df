//! GitHub provider for repository access scanning
//!
//! Implements [`repo_policy_core::RepositorySource`] over the GitHub REST API.

pub mod client;
pub mod config;
pub mod error;
pub mod pagination;

pub use client::GitHubClient;
pub use config::{GitHubConfig, DEFAULT_API_URL};
pub use error::GitHubError;
