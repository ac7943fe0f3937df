//! repo-policyd - repository access policy scan daemon
//!
//! Loads configuration from flags, the environment and `.env`, optionally
//! runs one startup scan, then serves scan requests until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};

use repo_policy_core::{OrgScanner, ScanSettings};
use repo_policy_github::{GitHubClient, GitHubConfig};
use repo_policy_opa::{OpaConfig, OpaOracle};
use repo_policyd::{build_router, run_startup_scan, serve, shutdown_signal, DaemonArgs, DaemonConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = DaemonArgs::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    repo_policy_core::init_tracing(args.json, level);
    if let Err(e) = dotenv {
        warn!(error = %e, "no .env file loaded");
    }

    let config = DaemonConfig::from_args(args).context("invalid configuration")?;

    let github = GitHubClient::new(
        GitHubConfig::new(&config.github_token).with_api_url(&config.github_api_url),
    )
    .context("failed to create GitHub client")?;
    let oracle = OpaOracle::new(
        OpaConfig::new(&config.opa_url)
            .with_package(&config.opa_package)
            .with_request_timeout(config.oracle_timeout),
    )
    .context("failed to create OPA client")?;
    if let Err(e) = oracle.health().await {
        warn!(url = %config.opa_url, error = %e, "policy oracle not reachable yet");
    }

    let scanner = Arc::new(OrgScanner::new(
        Arc::new(github),
        Arc::new(oracle),
        ScanSettings::new(&config.org).with_oracle_timeout(config.oracle_timeout),
    ));
    info!(org = %config.org, "starting repository policy daemon");

    if let Some(policy) = &config.startup_policy {
        let mut stdout = std::io::stdout();
        if let Err(e) = run_startup_scan(scanner.as_ref(), policy, &mut stdout).await {
            warn!(error = %e, "startup scan failed");
        }
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %listener.local_addr()?, "listening");

    serve(listener, build_router(scanner), shutdown_signal())
        .await
        .context("server error")?;
    info!("daemon stopped");
    Ok(())
}
