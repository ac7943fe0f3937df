//! Client side of the repository policy scanner: talks to `repo-policyd`,
//! loads policy files and renders results.

pub mod client;
pub mod output;
pub mod policy_files;

pub use client::{ClientError, HttpPolicyScan, DEFAULT_SERVER};
pub use output::OutputFormat;
pub use policy_files::{load_policies, PolicyFileError};
