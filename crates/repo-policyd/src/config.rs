//! Daemon configuration
//!
//! Every setting can come from a flag or its environment variable; a `.env`
//! file in the working directory is loaded before parsing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use repo_policy_github::DEFAULT_API_URL;
use repo_policy_opa::{DEFAULT_OPA_URL, DEFAULT_PACKAGE};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:50051";

#[derive(Parser, Debug, Clone)]
#[command(name = "repo-policyd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan an organization's repositories against access policies", long_about = None)]
pub struct DaemonArgs {
    /// GitHub token used for every API call
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Organization to scan
    #[arg(long, env = "ORG_NAME")]
    pub org: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Open Policy Agent base URL
    #[arg(long, env = "OPA_URL", default_value = DEFAULT_OPA_URL)]
    pub opa_url: String,

    /// Rego package holding the allow/deny rules
    #[arg(long, env = "OPA_PACKAGE", default_value = DEFAULT_PACKAGE)]
    pub opa_package: String,

    #[arg(long, env = "REPO_POLICY_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Bound on each oracle call, in seconds
    #[arg(long, env = "ORACLE_TIMEOUT_SECS", default_value_t = 10)]
    pub oracle_timeout_secs: u64,

    /// Scan once with this policy file before serving
    #[arg(long)]
    pub startup_policy: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GITHUB_TOKEN is required")]
    MissingToken,

    #[error("ORG_NAME is required")]
    MissingOrg,

    #[error("oracle timeout must be at least one second")]
    ZeroTimeout,

    #[error("failed to read policy file {path:?}: {source}")]
    PolicyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy file {0:?} is empty")]
    EmptyPolicy(PathBuf),
}

/// Validated daemon settings.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub github_token: String,
    pub org: String,
    pub github_api_url: String,
    pub opa_url: String,
    pub opa_package: String,
    pub listen: SocketAddr,
    pub oracle_timeout: Duration,
    /// Contents of the startup policy file, if one was given
    pub startup_policy: Option<String>,
}

fn required(value: Option<String>, missing: ConfigError) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing),
    }
}

impl DaemonConfig {
    pub fn from_args(args: DaemonArgs) -> Result<Self, ConfigError> {
        let github_token = required(args.github_token, ConfigError::MissingToken)?;
        let org = required(args.org, ConfigError::MissingOrg)?;
        if args.oracle_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let startup_policy = match args.startup_policy {
            Some(path) => Some(read_policy(path)?),
            None => None,
        };
        Ok(DaemonConfig {
            github_token,
            org,
            github_api_url: args.github_api_url,
            opa_url: args.opa_url,
            opa_package: args.opa_package,
            listen: args.listen,
            oracle_timeout: Duration::from_secs(args.oracle_timeout_secs),
            startup_policy,
        })
    }
}

fn read_policy(path: PathBuf) -> Result<String, ConfigError> {
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::PolicyFile {
        path: path.clone(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(ConfigError::EmptyPolicy(path));
    }
    Ok(text)
}
