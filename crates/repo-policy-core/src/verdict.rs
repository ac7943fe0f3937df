//! Verdict resolver.
//!
//! Turns one oracle evaluation into exactly one [`ScanOutcome`]:
//!
//! | evaluation                              | outcome           |
//! |-----------------------------------------|-------------------|
//! | oracle failed / malformed result        | `EvaluationError` |
//! | `deny == true`                          | `Denied`          |
//! | `deny` absent/false, `allow == true`    | `Allowed`         |
//! | neither signal true                     | `Denied`          |
//!
//! Every function here is pure: the same input always yields the same outcome.

use tracing::debug;

use crate::domain::outcome::{ScanOutcome, FAILURE_LABEL, SUCCESS_LABEL};
use crate::oracle::{OracleError, OracleOutput, SignalSet};

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Resolve a well-formed signal set. Deny wins over allow; no explicit allow
/// is a denial.
pub fn resolve_signals(signals: &SignalSet) -> ScanOutcome {
    if signals.deny == Some(true) {
        return ScanOutcome::Denied;
    }
    if signals.allow == Some(true) {
        return ScanOutcome::Allowed;
    }
    debug!(?signals, "no allow signal, default deny");
    ScanOutcome::Denied
}

/// Resolve the result of one oracle call.
///
/// Oracle failures and malformed result documents become
/// [`ScanOutcome::EvaluationError`]; they never masquerade as a decision.
pub fn resolve_verdict(evaluation: &Result<OracleOutput, OracleError>) -> ScanOutcome {
    let output = match evaluation {
        Ok(output) => output,
        Err(err) => return ScanOutcome::EvaluationError(err.to_string()),
    };
    match SignalSet::from_output(output) {
        Ok(signals) => resolve_signals(&signals),
        Err(err) => ScanOutcome::EvaluationError(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Whether a raw scan-result label carries an error marker.
///
/// Case-insensitive match on `"error"` or `"failed"`. The decision labels
/// themselves (`Success`, `Failure`) never match.
pub fn label_marks_error(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("error") || lower.contains("failed")
}

/// Resolve a scan-result label received from a remote scanner.
///
/// Error markers are checked first so an upstream-injected error text
/// short-circuits even if it also reads like a decision. Unrecognized labels
/// are treated as errors carrying the label text.
pub fn resolve_label(label: &str) -> ScanOutcome {
    let trimmed = label.trim();
    if label_marks_error(trimmed) {
        return ScanOutcome::EvaluationError(trimmed.to_string());
    }
    if trimmed.eq_ignore_ascii_case(SUCCESS_LABEL) {
        ScanOutcome::Allowed
    } else if trimmed.eq_ignore_ascii_case(FAILURE_LABEL) {
        ScanOutcome::Denied
    } else if trimmed.is_empty() {
        ScanOutcome::EvaluationError("repository has no scan result".to_string())
    } else {
        ScanOutcome::EvaluationError(trimmed.to_string())
    }
}
