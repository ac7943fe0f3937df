//! OPA connection settings

use std::time::Duration;

pub const DEFAULT_OPA_URL: &str = "http://127.0.0.1:8181";

/// Package the policies are expected to declare.
pub const DEFAULT_PACKAGE: &str = "repository";

#[derive(Debug, Clone)]
pub struct OpaConfig {
    pub base_url: String,
    /// Dotted Rego package whose document carries the `allow`/`deny` rules
    pub package: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for OpaConfig {
    fn default() -> Self {
        OpaConfig {
            base_url: DEFAULT_OPA_URL.to_string(),
            package: DEFAULT_PACKAGE.to_string(),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl OpaConfig {
    pub fn new(base_url: &str) -> Self {
        OpaConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_package(mut self, package: &str) -> Self {
        self.package = package.trim().to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Data API path of the package document, e.g. `acme.repos` -> `acme/repos`.
    pub fn data_path(&self) -> String {
        self.package
            .trim_start_matches("data.")
            .split('.')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}
