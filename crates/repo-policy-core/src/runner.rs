//! Multi-policy runner.
//!
//! Runs each policy of an ordered list through a [`PolicyScan`] and folds the
//! summaries into a [`Report`]. Policies run one at a time; a failing or
//! timed-out policy is recorded and the run moves on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::{summarize, PolicySummary, SummaryClass};
use crate::domain::error::ScanError;
use crate::domain::record::AccessRecord;
use crate::metrics::METRICS;
use crate::obs::{emit_policy_scan_failed, emit_policy_summarized};

/// Anything that can evaluate one policy against the organization and return
/// the scanned records.
#[async_trait]
pub trait PolicyScan: Send + Sync {
    async fn scan_policy(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError>;
}

/// Per-class totals. No-match summaries count as errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub success: usize,
    pub failure: usize,
    pub error: usize,
}

impl ReportTotals {
    pub fn total(&self) -> usize {
        self.success + self.failure + self.error
    }

    fn record(&mut self, class: SummaryClass) {
        match class {
            SummaryClass::Success => self.success += 1,
            SummaryClass::Failure => self.failure += 1,
            SummaryClass::Error | SummaryClass::NoMatch => self.error += 1,
        }
    }
}

/// Result of a multi-policy run, summaries in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub summaries: Vec<PolicySummary>,
    pub totals: ReportTotals,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Build a report, classifying each summary exactly once.
    pub fn from_summaries(summaries: Vec<PolicySummary>) -> Self {
        let mut totals = ReportTotals::default();
        for summary in &summaries {
            totals.record(summary.classify());
        }
        Self {
            summaries,
            totals,
            generated_at: Utc::now(),
        }
    }

    /// True when every policy succeeded.
    pub fn all_passed(&self) -> bool {
        self.totals.failure == 0 && self.totals.error == 0
    }
}

pub struct MultiPolicyRunner {
    scanner: Arc<dyn PolicyScan>,
    timeout: Duration,
}

impl MultiPolicyRunner {
    pub fn new(scanner: Arc<dyn PolicyScan>, timeout: Duration) -> Self {
        Self { scanner, timeout }
    }

    /// Scan one policy, giving up after the configured timeout.
    pub async fn scan_with_timeout(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError> {
        match tokio::time::timeout(self.timeout, self.scanner.scan_policy(policy)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout(self.timeout)),
        }
    }

    /// Scan and summarize a single policy.
    pub async fn run_one(&self, policy: &str) -> PolicySummary {
        let scan = self.scan_with_timeout(policy).await;
        if let Err(e) = &scan {
            emit_policy_scan_failed(e);
        }
        let summary = summarize(policy, &scan);
        METRICS.inc_policies_summarized();
        emit_policy_summarized(&summary);
        summary
    }

    /// Run every policy in order.
    pub async fn run(&self, policies: &[String]) -> Report {
        let mut summaries = Vec::with_capacity(policies.len());
        for policy in policies {
            summaries.push(self.run_one(policy).await);
        }
        Report::from_summaries(summaries)
    }
}
