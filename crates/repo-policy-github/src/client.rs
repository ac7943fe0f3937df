//! GitHub REST client
//!
//! Every list endpoint is followed through its `Link` header until the last
//! page, so callers always receive complete lists.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use repo_policy_core::{FetchError, RawRepository, RepositorySource};

use crate::config::GitHubConfig;
use crate::error::GitHubError;
use crate::pagination::next_link;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct PermissionLevel {
    permission: String,
}

/// GitHub REST client
pub struct GitHubClient {
    config: GitHubConfig,
    http: Client,
}

impl GitHubClient {
    /// Create a client authenticated with the configured token
    pub fn new(config: GitHubConfig) -> Result<Self, GitHubError> {
        if config.token.trim().is_empty() {
            return Err(GitHubError::MissingToken);
        }
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
            .map_err(|_| GitHubError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(GitHubClient { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn list_url(&self, path: &str, query: &str) -> String {
        let sep = if query.is_empty() { "" } else { "&" };
        self.url(&format!(
            "{path}?{query}{sep}per_page={}",
            self.config.per_page
        ))
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        check_status(response, url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.get(url)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Fetch every page starting at `url`.
    async fn get_all<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>, FetchError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let response = self.get(&url).await?;
            next = response
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);
            let page = response
                .json::<Vec<T>>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            items.extend(page);
            debug!(fetched = items.len(), more = next.is_some(), "fetched page");
        }
        Ok(items)
    }
}

/// Map a non-success response onto a [`FetchError`].
///
/// 403 and 429 answers with an exhausted rate-limit budget are reported as
/// [`FetchError::RateLimited`].
fn check_status(response: Response, url: &str) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let exhausted = header(RATE_LIMIT_REMAINING).as_deref() == Some("0");
    match status {
        StatusCode::NOT_FOUND => Err(FetchError::NotFound(url.to_string())),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN
            if exhausted || status == StatusCode::TOO_MANY_REQUESTS =>
        {
            Err(FetchError::RateLimited {
                reset: header(RATE_LIMIT_RESET).unwrap_or_else(|| "unknown".to_string()),
            })
        }
        _ => Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn list_repositories(&self, org: &str) -> Result<Vec<RawRepository>, FetchError> {
        info!(org = %org, "listing organization repositories");
        let repos: Vec<RawRepository> = self
            .get_all(self.list_url(&format!("/orgs/{org}/repos"), "type=all"))
            .await?;
        info!(org = %org, count = repos.len(), "repositories listed");
        Ok(repos)
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<RawRepository, FetchError> {
        self.get_json(&self.url(&format!("/repos/{owner}/{name}")))
            .await
    }

    async fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<String>, FetchError> {
        let accounts: Vec<Account> = self
            .get_all(self.list_url(&format!("/repos/{owner}/{repo}/collaborators"), ""))
            .await?;
        Ok(accounts.into_iter().map(|a| a.login).collect())
    }

    async fn list_repository_teams(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<String>, FetchError> {
        let teams: Vec<TeamRef> = self
            .get_all(self.list_url(&format!("/repos/{owner}/{repo}/teams"), ""))
            .await?;
        Ok(teams.into_iter().map(|t| t.slug).collect())
    }

    async fn list_team_members(&self, org: &str, team_slug: &str) -> Result<Vec<String>, FetchError> {
        let accounts: Vec<Account> = self
            .get_all(self.list_url(&format!("/orgs/{org}/teams/{team_slug}/members"), ""))
            .await?;
        Ok(accounts.into_iter().map(|a| a.login).collect())
    }

    async fn permission_level(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<String, FetchError> {
        let level: PermissionLevel = self
            .get_json(&self.url(&format!(
                "/repos/{owner}/{repo}/collaborators/{username}/permission"
            )))
            .await?;
        Ok(level.permission)
    }
}
