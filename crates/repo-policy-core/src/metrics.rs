//! Process-wide atomic counters for scan activity.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as one `tracing::info!` event
//! (the scanner does this at the end of every scan).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counters.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    repositories_scanned: AtomicU64,
    evaluation_errors: AtomicU64,
    fetch_degradations: AtomicU64,
    policies_summarized: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            repositories_scanned: AtomicU64::new(0),
            evaluation_errors: AtomicU64::new(0),
            fetch_degradations: AtomicU64::new(0),
            policies_summarized: AtomicU64::new(0),
        }
    }

    pub fn inc_repositories_scanned(&self) {
        self.repositories_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_evaluation_errors(&self) {
        self.evaluation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_degradations(&self) {
        self.fetch_degradations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_policies_summarized(&self) {
        self.policies_summarized.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            repositories_scanned = self.repositories_scanned(),
            evaluation_errors = self.evaluation_errors(),
            fetch_degradations = self.fetch_degradations(),
            policies_summarized = self.policies_summarized(),
        );
    }

    pub fn repositories_scanned(&self) -> u64 {
        self.repositories_scanned.load(Ordering::Relaxed)
    }

    pub fn evaluation_errors(&self) -> u64 {
        self.evaluation_errors.load(Ordering::Relaxed)
    }

    pub fn fetch_degradations(&self) -> u64 {
        self.fetch_degradations.load(Ordering::Relaxed)
    }

    pub fn policies_summarized(&self) -> u64 {
        self.policies_summarized.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Uses a local instance; the global one is shared with concurrently
    // running tests.
    #[test]
    fn test_counters_increment_independently() {
        let m = Metrics::new();
        m.inc_repositories_scanned();
        m.inc_repositories_scanned();
        m.inc_evaluation_errors();
        assert_eq!(m.repositories_scanned(), 2);
        assert_eq!(m.evaluation_errors(), 1);
        assert_eq!(m.fetch_degradations(), 0);
        assert_eq!(m.policies_summarized(), 0);
        m.flush();
    }
}
