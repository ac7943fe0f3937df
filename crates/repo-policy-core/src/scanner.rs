//! Organization scanner.
//!
//! [`OrgScanner`] takes one policy through a full scan: load it into the
//! oracle, fetch the organization snapshot, evaluate every repository in turn,
//! and release the policy. Repositories are processed sequentially; each
//! oracle call is bounded by the configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{warn, Instrument};

use crate::builder::{AccessRecordBuilder, RepositorySource};
use crate::domain::error::ScanError;
use crate::domain::outcome::ScanOutcome;
use crate::domain::record::{policy_digest, AccessRecord};
use crate::metrics::METRICS;
use crate::obs::{emit_repository_evaluated, emit_repository_skipped, emit_scan_started, scan_span};
use crate::oracle::{OracleError, PolicyHandle, PolicyOracle};
use crate::runner::PolicyScan;
use crate::verdict::resolve_verdict;

/// Default bound on a single oracle call.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// What to scan and how long to wait on the oracle.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub org: String,
    pub oracle_timeout: Duration,
}

impl ScanSettings {
    pub fn new(org: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }
}

/// Scans every repository of one organization against a policy.
pub struct OrgScanner {
    source: Arc<dyn RepositorySource>,
    builder: AccessRecordBuilder,
    oracle: Arc<dyn PolicyOracle>,
    settings: ScanSettings,
}

impl OrgScanner {
    pub fn new(
        source: Arc<dyn RepositorySource>,
        oracle: Arc<dyn PolicyOracle>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            builder: AccessRecordBuilder::new(Arc::clone(&source)),
            source,
            oracle,
            settings,
        }
    }

    pub fn org(&self) -> &str {
        &self.settings.org
    }

    /// Fetch the complete organization snapshot.
    ///
    /// Failing to list the organization fails the scan; a repository whose
    /// details cannot be fetched is skipped.
    pub async fn fetch_records(&self) -> Result<Vec<AccessRecord>, ScanError> {
        let org = self.org();
        let listed = self
            .source
            .list_repositories(org)
            .await
            .map_err(|source| ScanError::ListRepositories {
                org: org.to_string(),
                source,
            })?;

        let mut records = Vec::with_capacity(listed.len());
        for repo in &listed {
            match self.builder.build(org, repo).await {
                Ok(record) => records.push(record),
                Err(e) => emit_repository_skipped(&repo.name, &e),
            }
        }
        Ok(records)
    }

    /// Run one policy over the organization.
    ///
    /// Returns every scanned record with `scan_result` set. A policy the
    /// oracle rejects fails before any data is fetched.
    pub async fn scan(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError> {
        let span = scan_span(&policy_digest(policy));
        self.scan_in_span(policy).instrument(span).await
    }

    async fn scan_in_span(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError> {
        let mut loaded = LoadedPolicy::new(Arc::clone(&self.oracle), self.oracle.handle_for(policy));
        match self.bounded(self.oracle.load(policy)).await {
            Ok(handle) => loaded.handle = handle,
            // the oracle may have stored the policy after we stopped waiting
            Err(e @ OracleError::Timeout(_)) => {
                loaded.release().await;
                return Err(e.into());
            }
            Err(e) => {
                loaded.disarm();
                return Err(e.into());
            }
        }
        let result = self.scan_loaded(&loaded.handle).await;
        loaded.release().await;
        METRICS.flush();
        result
    }

    async fn scan_loaded(&self, handle: &PolicyHandle) -> Result<Vec<AccessRecord>, ScanError> {
        let mut records = self.fetch_records().await?;
        emit_scan_started(self.org(), records.len());
        for record in records.iter_mut() {
            let outcome = self.evaluate_record(handle, record).await;
            METRICS.inc_repositories_scanned();
            if outcome.is_error() {
                METRICS.inc_evaluation_errors();
            }
            emit_repository_evaluated(record.display_name(), &outcome);
            record.scan_result = Some(outcome);
        }
        Ok(records)
    }

    /// Resolve the verdict for one record under a loaded policy.
    pub async fn evaluate_record(&self, handle: &PolicyHandle, record: &AccessRecord) -> ScanOutcome {
        if let Err(e) = record.validate() {
            return ScanOutcome::EvaluationError(format!("invalid access record: {e}"));
        }
        let input = match record.policy_input() {
            Ok(input) => input,
            Err(e) => {
                return ScanOutcome::EvaluationError(format!(
                    "failed to encode access record: {e}"
                ))
            }
        };
        let evaluation = self.bounded(self.oracle.evaluate(handle, &input)).await;
        resolve_verdict(&evaluation)
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, OracleError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        let limit = self.settings.oracle_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(limit)),
        }
    }
}

/// A policy held by the oracle for the duration of one scan.
///
/// Dropped while still armed (the scan future was cancelled mid-flight), it
/// releases the policy on a background task.
struct LoadedPolicy {
    oracle: Arc<dyn PolicyOracle>,
    handle: PolicyHandle,
    armed: bool,
}

impl LoadedPolicy {
    fn new(oracle: Arc<dyn PolicyOracle>, handle: PolicyHandle) -> Self {
        Self {
            oracle,
            handle,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }

    async fn release(mut self) {
        self.armed = false;
        unload(self.oracle.as_ref(), &self.handle).await;
    }
}

impl Drop for LoadedPolicy {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(policy = %self.handle.id, "no runtime to release cancelled policy");
            return;
        };
        let oracle = Arc::clone(&self.oracle);
        let handle = self.handle.clone();
        runtime.spawn(async move { unload(oracle.as_ref(), &handle).await });
    }
}

async fn unload(oracle: &dyn PolicyOracle, handle: &PolicyHandle) {
    if let Err(e) = oracle.unload(handle).await {
        warn!(policy = %handle.id, error = %e, "failed to unload policy");
    }
}

#[async_trait]
impl PolicyScan for OrgScanner {
    async fn scan_policy(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError> {
        self.scan(policy).await
    }
}
