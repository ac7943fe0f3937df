//! Daemon HTTP surface over a local listener.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use repo_policy_core::fakes::{MemoryPolicyScan, MemoryRepositorySource, ScriptedOracle};
use repo_policy_core::{
    AccessRecord, OracleError, OracleOutput, OrgScanner, PolicyScan, RawOwner, RawRepository,
    ScanError, ScanOutcome, ScanResponse, ScanSettings,
};
use repo_policyd::{build_router, serve};

struct Daemon {
    base_url: String,
    stop: Option<oneshot::Sender<()>>,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn start(scanner: Arc<dyn PolicyScan>) -> Daemon {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = serve(listener, build_router(scanner), async {
            let _ = rx.await;
        })
        .await;
    });
    Daemon {
        base_url,
        stop: Some(tx),
    }
}

async fn post_scan(daemon: &Daemon, policy: &str) -> ScanResponse {
    reqwest::Client::new()
        .post(format!("{}/v1/scan", daemon.base_url))
        .json(&json!({ "policy": policy }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let daemon = start(Arc::new(MemoryPolicyScan::new())).await;
    let body: Value = reqwest::get(format!("{}/healthz", daemon.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_scan_returns_labels() {
    let records = vec![
        AccessRecord {
            name: "api".to_string(),
            scan_result: Some(ScanOutcome::Allowed),
            ..Default::default()
        },
        AccessRecord {
            name: "site".to_string(),
            scan_result: Some(ScanOutcome::EvaluationError(
                "policy evaluation timed out after 10s".to_string(),
            )),
            ..Default::default()
        },
    ];
    let daemon = start(Arc::new(MemoryPolicyScan::new().with_result("p", Ok(records)))).await;
    let response = post_scan(&daemon, "p").await;

    assert_eq!(response.error, None);
    let labels: Vec<_> = response
        .repositories
        .iter()
        .map(|r| r.scan_result.as_str())
        .collect();
    assert_eq!(labels, vec!["Success", "policy evaluation timed out after 10s"]);
}

#[tokio::test]
async fn test_policy_level_failure_sets_error() {
    let scan = MemoryPolicyScan::new().with_result(
        "bad",
        Err(ScanError::Oracle(OracleError::Compile("rego_parse_error".into()))),
    );
    let daemon = start(Arc::new(scan)).await;
    let response = post_scan(&daemon, "bad").await;
    assert!(response.repositories.is_empty());
    assert_eq!(
        response.error.as_deref(),
        Some("failed to prepare policy: rego_parse_error")
    );
}

#[tokio::test]
async fn test_blank_policy_is_rejected_without_scanning() {
    let scan = Arc::new(MemoryPolicyScan::new());
    let daemon = start(scan.clone()).await;
    let response = post_scan(&daemon, "   ").await;
    assert!(response.error.is_some());
    assert!(scan.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_are_serialized() {
    let scan = Arc::new(MemoryPolicyScan::new().with_delay("p", Duration::from_millis(100)));
    let daemon = start(scan.clone()).await;
    let (a, b, c) = tokio::join!(
        post_scan(&daemon, "p"),
        post_scan(&daemon, "p"),
        post_scan(&daemon, "p")
    );
    assert_eq!(a.error, None);
    assert_eq!(b.error, None);
    assert_eq!(c.error, None);
    assert_eq!(scan.calls().len(), 3);
    assert_eq!(scan.max_in_flight(), 1);
}

#[tokio::test]
async fn test_org_scanner_behind_the_daemon() {
    let source = MemoryRepositorySource::new()
        .with_repository(RawRepository {
            name: "api".to_string(),
            full_name: "acme/api".to_string(),
            owner: RawOwner {
                login: "acme".to_string(),
            },
            visibility: Some("private".to_string()),
            private: true,
            ..Default::default()
        })
        .with_collaborator("api", "alice", "admin");
    let oracle = ScriptedOracle::new(|input| {
        Ok(OracleOutput::new(json!({ "allow": input["private"] == true })))
    });
    let scanner = OrgScanner::new(Arc::new(source), Arc::new(oracle), ScanSettings::new("acme"));
    let daemon = start(Arc::new(scanner)).await;

    let records = post_scan(&daemon, "package repository")
        .await
        .into_scan()
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].permissions[0].username, "alice");
    assert_eq!(records[0].scan_result, Some(ScanOutcome::Allowed));
}
