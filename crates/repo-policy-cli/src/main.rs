//! repo-policy - repository access policy scanner CLI
//!
//! ## Commands
//!
//! - `scan`: evaluate one or more policies and print the final summary
//! - `repos`: evaluate one policy and list every repository with its result

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use repo_policy_cli::output::{format_records, format_report};
use repo_policy_cli::{load_policies, HttpPolicyScan, OutputFormat, DEFAULT_SERVER};
use repo_policy_core::MultiPolicyRunner;

#[derive(Parser)]
#[command(name = "repo-policy")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate repository access policies against an organization", long_about = None)]
struct Cli {
    /// Enable verbose output (includes full scan responses)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Scan daemon base URL
    #[arg(long, global = true, env = "REPO_POLICY_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Per-policy call timeout in seconds
    #[arg(long, global = true, default_value_t = 3)]
    timeout_secs: u64,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate policies and print a summary per policy
    Scan {
        /// Policy file or directory of `.rego` files (repeatable)
        #[arg(short, long = "policy", required = true)]
        policies: Vec<PathBuf>,

        /// Exit non-zero unless every policy succeeds
        #[arg(long)]
        strict: bool,
    },

    /// Evaluate one policy and list every repository
    Repos {
        /// Policy file
        #[arg(short, long)]
        policy: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    repo_policy_core::init_tracing(cli.json, level);

    if cli.timeout_secs == 0 {
        bail!("--timeout-secs must be at least 1");
    }
    let timeout = Duration::from_secs(cli.timeout_secs);
    let client = HttpPolicyScan::new(&cli.server, timeout).context("failed to create client")?;
    info!(server = %client.base_url(), "using scan daemon");

    match cli.command {
        Commands::Scan { policies, strict } => {
            cmd_scan(client, timeout, &policies, cli.output, strict).await
        }
        Commands::Repos { policy } => {
            cmd_repos(client, timeout, policy, cli.output).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_scan(
    client: HttpPolicyScan,
    timeout: Duration,
    paths: &[PathBuf],
    output: OutputFormat,
    strict: bool,
) -> Result<ExitCode> {
    let policies = load_policies(paths).context("failed to load policies")?;
    let runner = MultiPolicyRunner::new(Arc::new(client), timeout);
    let report = runner.run(&policies).await;

    print!("{}", format_report(&report, output).context("failed to render report")?);
    info!("policy scanning completed");

    if strict && !report.all_passed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_repos(
    client: HttpPolicyScan,
    timeout: Duration,
    path: PathBuf,
    output: OutputFormat,
) -> Result<()> {
    let policies = load_policies(&[path]).context("failed to load policy")?;
    let runner = MultiPolicyRunner::new(Arc::new(client), timeout);
    let mut records = Vec::new();
    for policy in &policies {
        records.extend(runner.scan_with_timeout(policy).await?);
    }
    print!("{}", format_records(&records, output).context("failed to render repositories")?);
    Ok(())
}
