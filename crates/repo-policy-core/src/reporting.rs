//! Human-readable rendering of reports and repository listings.

use crate::aggregator::{PolicySummary, SummaryClass};
use crate::domain::record::AccessRecord;
use crate::runner::Report;

const RULE: &str = "------------------------------------------------------------";

/// Render the final multi-policy summary.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("\nFinal Summary of All Policies:\n");
    out.push_str(RULE);
    out.push('\n');
    for summary in &report.summaries {
        out.push_str("Policy:\n");
        out.push_str(&summary.policy);
        out.push('\n');
        out.push_str(&result_line(summary));
        out.push('\n');
        out.push_str(RULE);
        out.push('\n');
    }
    out.push_str(&format!("Total Policies: {}\n", report.summaries.len()));
    out.push_str(&format!(
        "Success: {}, Failure: {}, Error: {}\n",
        report.totals.success, report.totals.failure, report.totals.error
    ));
    out
}

fn result_line(summary: &PolicySummary) -> String {
    let reason = summary.reason().unwrap_or_default();
    match summary.classify() {
        SummaryClass::Success => "Result: SUCCESS".to_string(),
        SummaryClass::Failure => format!("Result: FAILURE - {reason}"),
        SummaryClass::Error => format!("Result: ERROR - {reason}"),
        SummaryClass::NoMatch => "Result: ERROR (NO MATCHING CONDITION)".to_string(),
    }
}

/// Render one repository's access listing.
pub fn render_repository(record: &AccessRecord) -> String {
    let result = record
        .scan_result
        .as_ref()
        .map(|o| o.label())
        .unwrap_or("-");
    let mut out = format!(
        "\nRepository: {:<30} | Owner: {:<15} | Visibility: {:<10} | Scan Result: {:<10}\n",
        record.display_name(), record.owner, record.visibility, result
    );
    out.push_str(&format!("   URL: {}\n", record.repo_url));
    out.push_str(&format!("   Description: {}\n", record.description));
    out.push_str(&format!("   Last Updated: {}\n", record.last_updated));
    out.push_str(&format!("   Default Branch: {}\n", record.default_branch));
    out.push_str("   Permissions:\n");
    if record.permissions.is_empty() {
        out.push_str("   - No collaborators found.\n");
    }
    for perm in &record.permissions {
        out.push_str(&format!(
            "   - User: {:<20} | Role: {:<10} | Source: {}\n",
            perm.username, perm.role, perm.source
        ));
    }
    out.push_str(RULE);
    out.push('\n');
    out
}
