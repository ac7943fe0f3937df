//! HTTP surface of the daemon.
//!
//! Scans are serialized: a request that arrives while another scan runs waits
//! for it to finish.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use repo_policy_core::{PolicyScan, ScanRequest, ScanResponse, VERSION};

#[derive(Clone)]
struct AppState {
    scanner: Arc<dyn PolicyScan>,
    scan_lock: Arc<Mutex<()>>,
}

/// Router exposing `POST /v1/scan` and `GET /healthz`.
pub fn build_router(scanner: Arc<dyn PolicyScan>) -> Router {
    let state = AppState {
        scanner,
        scan_lock: Arc::new(Mutex::new(())),
    };
    Router::new()
        .route("/v1/scan", post(scan))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn scan(State(state): State<AppState>, Json(request): Json<ScanRequest>) -> Json<ScanResponse> {
    info!("received scan request");
    if request.policy.trim().is_empty() {
        return Json(ScanResponse {
            repositories: Vec::new(),
            error: Some("policy must not be empty".to_string()),
        });
    }

    let _guard = state.scan_lock.lock().await;
    let result = state.scanner.scan_policy(&request.policy).await;
    match &result {
        Ok(records) => info!(repositories = records.len(), "scan complete"),
        Err(e) => warn!(error = %e, "scan failed"),
    }
    Json(ScanResponse::from_scan(&result))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

/// Serve `router` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
