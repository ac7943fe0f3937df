//! Optional scan run once before the daemon starts serving.

use std::io::{self, Write};

use tracing::{info, warn};

use repo_policy_core::{render_repository, AccessRecord, PolicyScan, ScanError};

/// Scan with `policy` and write every repository's listing to `out`.
///
/// Returns the number of repositories listed.
pub async fn run_startup_scan<W: Write>(
    scanner: &dyn PolicyScan,
    policy: &str,
    out: &mut W,
) -> Result<usize, ScanError> {
    info!("running startup scan");
    let records = scanner.scan_policy(policy).await?;
    // write errors never fail the scan
    if let Err(e) = write_listing(out, &records) {
        warn!(error = %e, "failed to write startup scan listing");
    }
    info!(repositories = records.len(), "startup scan complete");
    Ok(records.len())
}

fn write_listing<W: Write>(out: &mut W, records: &[AccessRecord]) -> io::Result<()> {
    for record in records {
        out.write_all(render_repository(record).as_bytes())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_policy_core::fakes::MemoryPolicyScan;
    use repo_policy_core::{OracleError, ScanOutcome};
    use tracing_test::traced_test;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_write_failure_is_logged_not_fatal() {
        let records = vec![AccessRecord {
            name: "api".to_string(),
            scan_result: Some(ScanOutcome::Allowed),
            ..Default::default()
        }];
        let scan = MemoryPolicyScan::new().with_result("p", Ok(records));
        let count = run_startup_scan(&scan, "p", &mut ClosedPipe).await.unwrap();

        assert_eq!(count, 1);
        assert!(logs_contain("failed to write startup scan listing"));
        assert!(logs_contain("pipe closed"));
    }

    #[tokio::test]
    async fn test_listing_written_for_each_repository() {
        let records = vec![
            AccessRecord {
                name: "api".to_string(),
                scan_result: Some(ScanOutcome::Allowed),
                ..Default::default()
            },
            AccessRecord {
                name: "site".to_string(),
                scan_result: Some(ScanOutcome::Denied),
                ..Default::default()
            },
        ];
        let scan = MemoryPolicyScan::new().with_result("p", Ok(records));
        let mut out = Vec::new();
        let count = run_startup_scan(&scan, "p", &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(count, 2);
        assert!(text.contains("Repository: api"));
        assert!(text.contains("Repository: site"));
        assert_eq!(text.matches("No collaborators found.").count(), 2);
    }

    #[tokio::test]
    async fn test_scan_error_is_returned() {
        let scan = MemoryPolicyScan::new().with_result(
            "p",
            Err(ScanError::Oracle(OracleError::Compile("eof".into()))),
        );
        let mut out = Vec::new();
        assert!(run_startup_scan(&scan, "p", &mut out).await.is_err());
        assert!(out.is_empty());
    }
}
