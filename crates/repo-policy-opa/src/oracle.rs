//! OPA REST oracle

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use repo_policy_core::{policy_digest, OracleError, OracleOutput, PolicyHandle, PolicyOracle};

use crate::config::OpaConfig;

/// Prefix of module ids uploaded by this oracle.
const MODULE_PREFIX: &str = "repo-policy";

/// Error document returned by OPA on 4xx/5xx.
#[derive(Debug, Default, Deserialize)]
struct OpaErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<OpaErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpaErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OpaErrorBody {
    /// Compiler errors when present, otherwise the top-level message.
    fn describe(&self) -> String {
        if self.errors.is_empty() {
            return self.message.clone();
        }
        self.errors
            .iter()
            .map(|e| {
                if e.code.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.code, e.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub struct OpaOracle {
    config: OpaConfig,
    http: Client,
}

impl OpaOracle {
    pub fn new(config: OpaConfig) -> Result<Self, OracleError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;
        Ok(OpaOracle { config, http })
    }

    pub fn config(&self) -> &OpaConfig {
        &self.config
    }

    fn policy_url(&self, id: &str) -> String {
        format!("{}/v1/policies/{id}", self.config.base_url)
    }

    fn data_url(&self) -> String {
        format!("{}/v1/data/{}", self.config.base_url, self.config.data_path())
    }

    fn transport(&self, err: reqwest::Error) -> OracleError {
        if err.is_timeout() {
            OracleError::Timeout(self.config.request_timeout)
        } else {
            OracleError::Unavailable(err.to_string())
        }
    }

    /// Check liveness via `/health`.
    pub async fn health(&self) -> Result<(), OracleError> {
        let url = format!("{}/health", self.config.base_url);
        let response = self.http.get(&url).send().await.map_err(|e| self.transport(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(OracleError::Unavailable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }
}

async fn error_body(response: Response) -> OpaErrorBody {
    let status = response.status();
    let body = response.json::<OpaErrorBody>().await.unwrap_or_default();
    if body.message.is_empty() && body.errors.is_empty() {
        return OpaErrorBody {
            message: format!("OPA returned {status}"),
            errors: Vec::new(),
        };
    }
    body
}

#[async_trait]
impl PolicyOracle for OpaOracle {
    fn handle_for(&self, policy: &str) -> PolicyHandle {
        let digest = policy_digest(policy);
        PolicyHandle {
            id: format!("{MODULE_PREFIX}-{}", &digest[..16]),
            digest,
        }
    }

    async fn load(&self, policy: &str) -> Result<PolicyHandle, OracleError> {
        let handle = self.handle_for(policy);
        debug!(module = %handle.id, "uploading policy module");

        let response = self
            .http
            .put(self.policy_url(&handle.id))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        match response.status() {
            s if s.is_success() => Ok(handle),
            StatusCode::BAD_REQUEST => Err(OracleError::Compile(error_body(response).await.describe())),
            _ => Err(OracleError::Unavailable(error_body(response).await.describe())),
        }
    }

    async fn evaluate(
        &self,
        handle: &PolicyHandle,
        input: &Value,
    ) -> Result<OracleOutput, OracleError> {
        debug!(module = %handle.id, "evaluating input");
        let response = self
            .http
            .post(self.data_url())
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<OracleOutput>()
                .await
                .map_err(|e| OracleError::MalformedResult(e.to_string()));
        }
        if status.is_server_error() || status == StatusCode::BAD_REQUEST {
            return Err(OracleError::Runtime(error_body(response).await.describe()));
        }
        Err(OracleError::Unavailable(error_body(response).await.describe()))
    }

    async fn unload(&self, handle: &PolicyHandle) -> Result<(), OracleError> {
        let response = self
            .http
            .delete(self.policy_url(&handle.id))
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(OracleError::Unavailable(error_body(response).await.describe())),
        }
    }
}
