//! GitHub client configuration

use std::time::Duration;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub client configuration
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST API base URL (GitHub Enterprise uses `https://host/api/v3`)
    pub api_url: String,
    /// Personal access or installation token
    pub token: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Page size requested from list endpoints (GitHub caps it at 100)
    pub per_page: u32,
}

impl GitHubConfig {
    pub fn new(token: &str) -> Self {
        GitHubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.to_string(),
            user_agent: format!("repo-policy/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            per_page: 100,
        }
    }

    /// Point at a different API host
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_trailing_slash_is_dropped() {
        let config = GitHubConfig::new("t").with_api_url("https://ghe.example.com/api/v3/");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_per_page_is_clamped() {
        assert_eq!(GitHubConfig::new("t").with_per_page(500).per_page, 100);
        assert_eq!(GitHubConfig::new("t").with_per_page(0).per_page, 1);
    }
}
