//! Output formats for command results.

use clap::ValueEnum;

use repo_policy_core::{render_report, render_repository, AccessRecord, RepositoryReport, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

pub fn format_report(report: &Report, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Human => Ok(render_report(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report),
    }
}

pub fn format_records(records: &[AccessRecord], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Human => Ok(records.iter().map(render_repository).collect()),
        OutputFormat::Json => {
            let reports: Vec<RepositoryReport> = records.iter().map(RepositoryReport::from).collect();
            serde_json::to_string_pretty(&reports)
        }
    }
}
