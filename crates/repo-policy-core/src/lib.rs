//! Repository Policy Core Library
//!
//! Builds per-repository access records, evaluates them against a policy
//! oracle, and aggregates the verdicts into per-policy summaries.

pub mod aggregator;
pub mod builder;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod oracle;
pub mod reporting;
pub mod runner;
pub mod scanner;
pub mod telemetry;
pub mod verdict;
pub mod wire;

pub use aggregator::{
    summarize, summarize_outcomes, ErrorKind, PolicyState, PolicySummary, SummaryClass,
    NO_MATCHING_CONDITION,
};
pub use builder::{normalize, AccessRecordBuilder, RawOwner, RawRepository, RepositorySource};
pub use domain::{
    policy_digest, AccessRecord, FetchError, PermissionEntry, PermissionSource, ScanError,
    ScanOutcome, ValidationError, FAILURE_LABEL, SUCCESS_LABEL,
};
pub use oracle::{OracleError, OracleOutput, PolicyHandle, PolicyOracle, SignalSet};
pub use reporting::{render_report, render_repository};
pub use runner::{MultiPolicyRunner, PolicyScan, Report, ReportTotals};
pub use scanner::{OrgScanner, ScanSettings, DEFAULT_ORACLE_TIMEOUT};
pub use verdict::{label_marks_error, resolve_label, resolve_signals, resolve_verdict};
pub use wire::{RepositoryReport, ScanRequest, ScanResponse};

pub use metrics::METRICS;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
