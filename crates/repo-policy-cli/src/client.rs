//! HTTP client for the scan daemon

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use repo_policy_core::{AccessRecord, PolicyScan, ScanError, ScanRequest, ScanResponse};

pub const DEFAULT_SERVER: &str = "http://localhost:50051";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode scan response: {0}")]
    Decode(String),
}

/// [`PolicyScan`] that forwards every policy to a running daemon.
pub struct HttpPolicyScan {
    base_url: String,
    http: Client,
}

impl HttpPolicyScan {
    pub fn new(server: &str, connect_timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(HttpPolicyScan {
            base_url: server.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one scan request and decode the raw response.
    pub async fn request(&self, policy: &str) -> Result<ScanResponse, ClientError> {
        let url = format!("{}/v1/scan", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&ScanRequest {
                policy: policy.to_string(),
            })
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let scan: ScanResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        if let Ok(pretty) = serde_json::to_string_pretty(&scan) {
            debug!("full scan response:\n{pretty}");
        }
        Ok(scan)
    }
}

#[async_trait]
impl PolicyScan for HttpPolicyScan {
    async fn scan_policy(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError> {
        debug!("scanning with policy:\n{policy}");
        self.request(policy)
            .await
            .map_err(|e| ScanError::Transport(e.to_string()))?
            .into_scan()
    }
}
