//! Scan aggregation.
//!
//! Collapses the per-repository outcomes of one policy scan into a single
//! [`PolicySummary`]. The first matching rule wins:
//!
//! 1. the scan itself failed → `Error` (policy-level)
//! 2. any repository errored → `Error` (repository-level)
//! 3. any repository denied → `Failure { count }`
//! 4. any repository allowed → `Success`
//! 5. otherwise → `Error` with [`NO_MATCHING_CONDITION`]
//!
//! The summary depends only on the multiset of outcomes, never on the order
//! repositories were scanned in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::ScanError;
use crate::domain::outcome::ScanOutcome;
use crate::domain::record::AccessRecord;

/// Diagnostic carried by a summary when no rule produced a decision.
pub const NO_MATCHING_CONDITION: &str = "no matching condition";

/// Which rule produced an [`PolicyState::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The scan or the oracle failed before any repository was decided.
    Policy,
    /// At least one repository's evaluation failed.
    Repository,
    /// No repository produced a decisive outcome.
    NoMatch,
}

/// Terminal state of one policy across an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PolicyState {
    Success,
    Failure {
        count: usize,
        /// Denied repositories, sorted.
        repositories: Vec<String>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Four-way classification used for report totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryClass {
    Success,
    Failure,
    Error,
    NoMatch,
}

/// One policy's aggregated verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySummary {
    /// Policy text, whitespace-trimmed.
    pub policy: String,
    pub state: PolicyState,
}

impl PolicySummary {
    pub fn classify(&self) -> SummaryClass {
        match &self.state {
            PolicyState::Success => SummaryClass::Success,
            PolicyState::Failure { .. } => SummaryClass::Failure,
            PolicyState::Error {
                kind: ErrorKind::NoMatch,
                ..
            } => SummaryClass::NoMatch,
            PolicyState::Error { .. } => SummaryClass::Error,
        }
    }

    /// Human-readable reason when the policy did not succeed.
    pub fn reason(&self) -> Option<String> {
        match &self.state {
            PolicyState::Success => None,
            PolicyState::Failure { count, repositories } => Some(format!(
                "{count} repositories denied: {}",
                repositories.join(", ")
            )),
            PolicyState::Error { message, .. } => Some(message.clone()),
        }
    }
}

/// Summarize a finished scan. Records that were never evaluated count as
/// repository errors.
pub fn summarize(policy: &str, scan: &Result<Vec<AccessRecord>, ScanError>) -> PolicySummary {
    let records = match scan {
        Ok(records) => records,
        Err(err) => {
            return summarize_outcomes(policy, Some(&err.to_string()), std::iter::empty())
        }
    };
    let outcomes: Vec<(&str, ScanOutcome)> = records
        .iter()
        .map(|r| {
            let outcome = r.scan_result.clone().unwrap_or_else(|| {
                ScanOutcome::EvaluationError(format!(
                    "repository {} was not evaluated",
                    r.display_name()
                ))
            });
            (r.display_name(), outcome)
        })
        .collect();
    summarize_outcomes(policy, None, outcomes.iter().map(|(n, o)| (*n, o)))
}

/// Apply the precedence rules to a set of `(repository, outcome)` pairs.
///
/// When several repositories errored, their distinct messages are sorted and
/// joined with `" | "` so the result does not depend on iteration order.
pub fn summarize_outcomes<'a, I>(
    policy: &str,
    policy_error: Option<&str>,
    outcomes: I,
) -> PolicySummary
where
    I: IntoIterator<Item = (&'a str, &'a ScanOutcome)>,
{
    let policy = policy.trim().to_string();

    if let Some(message) = policy_error {
        return PolicySummary {
            policy,
            state: PolicyState::Error {
                kind: ErrorKind::Policy,
                message: message.to_string(),
            },
        };
    }

    let mut errors = BTreeSet::new();
    let mut denied = BTreeSet::new();
    let mut denied_count = 0usize;
    let mut allowed = false;
    for (repository, outcome) in outcomes {
        match outcome {
            ScanOutcome::EvaluationError(message) => {
                errors.insert(message.as_str());
            }
            ScanOutcome::Denied => {
                denied_count += 1;
                denied.insert(repository.to_string());
            }
            ScanOutcome::Allowed => allowed = true,
        }
    }

    let state = if !errors.is_empty() {
        PolicyState::Error {
            kind: ErrorKind::Repository,
            message: errors.into_iter().collect::<Vec<_>>().join(" | "),
        }
    } else if denied_count > 0 {
        PolicyState::Failure {
            count: denied_count,
            repositories: denied.into_iter().collect(),
        }
    } else if allowed {
        PolicyState::Success
    } else {
        PolicyState::Error {
            kind: ErrorKind::NoMatch,
            message: NO_MATCHING_CONDITION.to_string(),
        }
    };

    PolicySummary { policy, state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;

    fn record(name: &str, outcome: Option<ScanOutcome>) -> AccessRecord {
        AccessRecord {
            name: name.to_string(),
            full_name: format!("acme/{name}"),
            scan_result: outcome,
            ..Default::default()
        }
    }

    #[test]
    fn test_policy_level_error_wins() {
        let scan = Err(ScanError::Oracle(OracleError::Compile("bad".to_string())));
        let summary = summarize("  package x  ", &scan);
        assert_eq!(summary.policy, "package x");
        assert_eq!(summary.classify(), SummaryClass::Error);
        assert!(matches!(
            summary.state,
            PolicyState::Error {
                kind: ErrorKind::Policy,
                ..
            }
        ));
    }

    #[test]
    fn test_repository_error_beats_failure_and_success() {
        let scan = Ok(vec![
            record("a", Some(ScanOutcome::Allowed)),
            record("b", Some(ScanOutcome::Denied)),
            record("c", Some(ScanOutcome::EvaluationError("boom".to_string()))),
        ]);
        let summary = summarize("p", &scan);
        assert_eq!(
            summary.state,
            PolicyState::Error {
                kind: ErrorKind::Repository,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_failure_counts_denied_repositories() {
        let scan = Ok(vec![
            record("b", Some(ScanOutcome::Denied)),
            record("a", Some(ScanOutcome::Allowed)),
            record("c", Some(ScanOutcome::Denied)),
        ]);
        let summary = summarize("p", &scan);
        assert_eq!(
            summary.state,
            PolicyState::Failure {
                count: 2,
                repositories: vec!["acme/b".to_string(), "acme/c".to_string()]
            }
        );
        assert!(summary.reason().unwrap().contains("acme/b, acme/c"));
    }

    #[test]
    fn test_empty_scan_is_no_match() {
        let summary = summarize("p", &Ok(Vec::new()));
        assert_eq!(summary.classify(), SummaryClass::NoMatch);
        assert_eq!(summary.reason().as_deref(), Some(NO_MATCHING_CONDITION));
    }

    #[test]
    fn test_unevaluated_record_is_an_error() {
        let scan = Ok(vec![record("a", Some(ScanOutcome::Allowed)), record("b", None)]);
        let summary = summarize("p", &scan);
        assert_eq!(summary.classify(), SummaryClass::Error);
        assert!(summary.reason().unwrap().contains("acme/b was not evaluated"));
    }

    #[test]
    fn test_multiple_error_messages_are_sorted_and_deduplicated() {
        let z = ScanOutcome::EvaluationError("z failed".to_string());
        let a = ScanOutcome::EvaluationError("a failed".to_string());
        let summary = summarize_outcomes("p", None, [("r1", &z), ("r2", &a), ("r3", &z)]);
        assert_eq!(summary.reason().as_deref(), Some("a failed | z failed"));
    }
}
