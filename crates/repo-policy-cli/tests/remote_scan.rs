//! Multi-policy runs against a stub daemon.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use repo_policy_cli::output::format_report;
use repo_policy_cli::{HttpPolicyScan, OutputFormat};
use repo_policy_core::{ErrorKind, MultiPolicyRunner, PolicyState, ReportTotals, SummaryClass};

struct Stub {
    base_url: String,
    join: JoinHandle<()>,
}

impl Drop for Stub {
    fn drop(&mut self) {
        self.join.abort();
    }
}

fn repo(name: &str, result: &str) -> Value {
    json!({
        "name": name,
        "full_name": format!("acme/{name}"),
        "owner": "acme",
        "visibility": "private",
        "private": true,
        "permissions": [{ "username": "alice", "role": "admin", "source": "user" }],
        "scan_result": result
    })
}

/// Answers by policy text: each policy names the scenario it wants.
async fn scan(Json(body): Json<Value>) -> Json<Value> {
    let policy = body["policy"].as_str().unwrap_or_default().trim().to_string();
    let response = match policy.as_str() {
        "allow" => json!({ "repositories": [repo("api", "Success")], "error": null }),
        "deny" => json!({
            "repositories": [repo("api", "Success"), repo("site", "Failure")],
            "error": null
        }),
        "injected" => json!({
            "repositories": [repo("api", "scan error: timeout")],
            "error": null
        }),
        "empty" => json!({ "repositories": [], "error": null }),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            json!({ "repositories": [repo("api", "Success")], "error": null })
        }
        _ => json!({
            "repositories": [],
            "error": "failed to prepare policy: rego_parse_error: var cannot be used for rule name"
        }),
    };
    Json(response)
}

async fn spawn_stub() -> Stub {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let app = Router::new().route("/v1/scan", post(scan));
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Stub { base_url, join }
}

fn runner(stub: &Stub, timeout: Duration) -> MultiPolicyRunner {
    let client = HttpPolicyScan::new(&stub.base_url, Duration::from_secs(1)).unwrap();
    MultiPolicyRunner::new(Arc::new(client), timeout)
}

fn policies(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| format!("\n  {p}\n")).collect()
}

#[tokio::test]
async fn test_full_run_over_the_wire() {
    let stub = spawn_stub().await;
    let report = runner(&stub, Duration::from_secs(2))
        .run(&policies(&["allow", "deny", "injected", "empty", "fdefsdfsd"]))
        .await;

    let classes: Vec<_> = report.summaries.iter().map(|s| s.classify()).collect();
    assert_eq!(
        classes,
        vec![
            SummaryClass::Success,
            SummaryClass::Failure,
            SummaryClass::Error,
            SummaryClass::NoMatch,
            SummaryClass::Error,
        ]
    );
    assert_eq!(report.summaries[0].policy, "allow");
    assert_eq!(
        report.summaries[2].state,
        PolicyState::Error {
            kind: ErrorKind::Repository,
            message: "scan error: timeout".to_string(),
        }
    );
    assert!(matches!(
        &report.summaries[4].state,
        PolicyState::Error { kind: ErrorKind::Policy, message } if message.starts_with("failed to prepare policy")
    ));
    assert_eq!(
        report.totals,
        ReportTotals {
            success: 1,
            failure: 1,
            error: 3
        }
    );

    let text = format_report(&report, OutputFormat::Human).unwrap();
    assert!(text.contains("Total Policies: 5"));
    assert!(text.contains("Success: 1, Failure: 1, Error: 3"));
}

#[tokio::test]
async fn test_slow_daemon_times_out_and_next_policy_runs() {
    let stub = spawn_stub().await;
    let report = runner(&stub, Duration::from_millis(300))
        .run(&policies(&["slow", "allow"]))
        .await;
    assert!(report.summaries[0]
        .reason()
        .unwrap_or_default()
        .contains("timed out"));
    assert_eq!(report.summaries[1].state, PolicyState::Success);
}

#[tokio::test]
async fn test_missing_daemon_reports_every_policy_as_error() {
    let client = HttpPolicyScan::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    let runner = MultiPolicyRunner::new(Arc::new(client), Duration::from_secs(2));
    let report = runner.run(&policies(&["allow", "deny"])).await;
    assert_eq!(report.totals.error, 2);
    assert_eq!(report.summaries.len(), 2);
}

async fn run_cli(stub: &Stub, args: &[&str]) -> std::process::Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_repo-policy"))
        .arg("--server")
        .arg(&stub.base_url)
        .args(args)
        .output()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_strict_scan_exits_non_zero_on_failure() {
    let stub = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let deny = dir.path().join("deny.rego");
    std::fs::write(&deny, "deny\n").unwrap();
    let deny = deny.to_str().unwrap();

    let relaxed = run_cli(&stub, &["scan", "--policy", deny]).await;
    assert!(relaxed.status.success());
    assert!(String::from_utf8_lossy(&relaxed.stdout).contains("Result: FAILURE"));

    let strict = run_cli(&stub, &["scan", "--policy", deny, "--strict"]).await;
    assert_eq!(strict.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&strict.stdout).contains("Success: 0, Failure: 1, Error: 0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_strict_scan_exits_zero_when_all_pass() {
    let stub = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let allow = dir.path().join("allow.rego");
    std::fs::write(&allow, "allow\n").unwrap();

    let output = run_cli(&stub, &["scan", "--policy", allow.to_str().unwrap(), "--strict"]).await;
    assert!(output.status.success());
}
