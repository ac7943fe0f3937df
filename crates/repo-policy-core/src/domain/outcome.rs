//! Per-repository verdict.

use serde::{Deserialize, Serialize};

/// Display label for [`ScanOutcome::Allowed`].
pub const SUCCESS_LABEL: &str = "Success";
/// Display label for [`ScanOutcome::Denied`].
pub const FAILURE_LABEL: &str = "Failure";

/// The decision reached for one repository under one policy.
///
/// Only rendered to a label at the reporting/wire boundary; see
/// [`ScanOutcome::label`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum ScanOutcome {
    Allowed,
    Denied,
    EvaluationError(String),
}

impl ScanOutcome {
    /// `"Success"`, `"Failure"`, or the error text.
    pub fn label(&self) -> &str {
        match self {
            ScanOutcome::Allowed => SUCCESS_LABEL,
            ScanOutcome::Denied => FAILURE_LABEL,
            ScanOutcome::EvaluationError(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScanOutcome::EvaluationError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ScanOutcome::Allowed.label(), "Success");
        assert_eq!(ScanOutcome::Denied.label(), "Failure");
        assert_eq!(
            ScanOutcome::EvaluationError("network timeout".to_string()).label(),
            "network timeout"
        );
    }

    #[test]
    fn test_tagged_serialization() {
        let json = serde_json::to_value(ScanOutcome::EvaluationError("boom".to_string())).unwrap();
        assert_eq!(json["outcome"], "evaluation_error");
        assert_eq!(json["message"], "boom");
        let json = serde_json::to_value(ScanOutcome::Denied).unwrap();
        assert_eq!(json["outcome"], "denied");
    }
}
