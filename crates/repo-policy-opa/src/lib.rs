//! Open Policy Agent oracle
//!
//! Implements [`repo_policy_core::PolicyOracle`] over the OPA REST API: a
//! policy is uploaded as a module, each access record is posted as `input`
//! to the package document, and the module is deleted once the scan is over.

pub mod config;
pub mod oracle;

pub use config::{OpaConfig, DEFAULT_OPA_URL, DEFAULT_PACKAGE};
pub use oracle::OpaOracle;
