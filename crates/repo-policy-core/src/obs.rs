//! Structured observability hooks for the scan lifecycle.
//!
//! - Scan-scoped tracing span via [`scan_span`]
//! - Emission functions for scan start, repository verdicts, degraded
//!   fetches, and policy summaries

use tracing::{info, warn};

use crate::aggregator::PolicySummary;
use crate::domain::outcome::ScanOutcome;

/// Span for one policy scan, tagged with a fresh scan id and the short
/// policy digest. Attach it with [`tracing::Instrument`].
///
/// ```ignore
/// scanner.scan_loaded(&handle).instrument(scan_span(&digest)).await
/// ```
pub fn scan_span(policy_digest: &str) -> tracing::Span {
    let scan_id = uuid::Uuid::new_v4();
    let short = &policy_digest[..policy_digest.len().min(12)];
    tracing::info_span!("repo_policy.scan", scan_id = %scan_id, policy = %short)
}

/// Emit event: organization listed, scan about to evaluate repositories.
pub fn emit_scan_started(org: &str, repositories: usize) {
    info!(event = "scan.started", org = %org, repositories = repositories);
}

/// Emit event: one repository's verdict.
pub fn emit_repository_evaluated(repository: &str, outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::EvaluationError(message) => {
            warn!(event = "repository.evaluated", repository = %repository, error = %message)
        }
        _ => info!(
            event = "repository.evaluated",
            repository = %repository,
            result = %outcome.label(),
        ),
    }
}

/// Emit event: a permission lookup failed and the record was degraded.
pub fn emit_fetch_degraded(repository: &str, what: &str, error: &dyn std::fmt::Display) {
    warn!(event = "fetch.degraded", repository = %repository, lookup = %what, error = %error);
}

/// Emit event: repository detail fetch failed, repository skipped.
pub fn emit_repository_skipped(repository: &str, error: &dyn std::fmt::Display) {
    warn!(event = "repository.skipped", repository = %repository, error = %error);
}

/// Emit event: a policy summary was finalized.
pub fn emit_policy_summarized(summary: &PolicySummary) {
    let reason = summary.reason().unwrap_or_default();
    info!(
        event = "policy.summarized",
        class = ?summary.classify(),
        reason = %reason,
    );
}

/// Emit event: the scan for a policy failed as a whole.
pub fn emit_policy_scan_failed(error: &dyn std::fmt::Display) {
    warn!(event = "policy.scan_failed", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_span_accepts_short_digest() {
        let _a = scan_span("abc").entered();
        let _b = scan_span("0123456789abcdef0123");
    }
}
