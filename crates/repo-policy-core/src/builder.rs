//! Access record builder.
//!
//! Normalizes raw provider data into [`AccessRecord`]s. Permission data is
//! best-effort: collaborator, team, and permission-level lookups that fail
//! degrade the record instead of failing the scan.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::FetchError;
use crate::domain::record::{AccessRecord, PermissionEntry, PermissionSource};
use crate::metrics::METRICS;
use crate::obs::emit_fetch_degraded;

/// Account that owns a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawOwner {
    #[serde(default)]
    pub login: String,
}

/// Repository object as the provider reports it.
///
/// Field names follow the provider's REST payload so it can be decoded
/// directly; everything but `name` is optional upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRepository {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub owner: RawOwner,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Source-control provider lookups needed to build access records.
///
/// Implementations own pagination, authentication, and rate limiting; every
/// list returned here is complete.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Every repository in `org`.
    async fn list_repositories(&self, org: &str) -> Result<Vec<RawRepository>, FetchError>;

    /// Full details of one repository.
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RawRepository, FetchError>;

    /// Logins of the repository's collaborators.
    async fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<String>, FetchError>;

    /// Slugs of the teams with access to the repository.
    async fn list_repository_teams(&self, owner: &str, repo: &str)
        -> Result<Vec<String>, FetchError>;

    /// Logins of a team's members.
    async fn list_team_members(&self, org: &str, team_slug: &str)
        -> Result<Vec<String>, FetchError>;

    /// Role label of `username` on the repository.
    async fn permission_level(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<String, FetchError>;
}

/// Builds [`AccessRecord`]s from a [`RepositorySource`].
pub struct AccessRecordBuilder {
    source: Arc<dyn RepositorySource>,
}

impl AccessRecordBuilder {
    pub fn new(source: Arc<dyn RepositorySource>) -> Self {
        Self { source }
    }

    /// Fetch full details for a listed repository and resolve its permissions.
    ///
    /// Only the detail fetch can fail; permission lookups degrade.
    pub async fn build(
        &self,
        org: &str,
        listed: &RawRepository,
    ) -> Result<AccessRecord, FetchError> {
        let owner = owner_of(listed, org);
        let details = self.source.get_repository(owner, &listed.name).await?;
        let permissions = self.resolve_permissions(org, &details).await;
        Ok(normalize(&details, permissions))
    }

    /// Resolve every collaborator's role and attribution.
    ///
    /// A collaborator who is a member of a team with access is attributed to
    /// that team; otherwise to `user`. Each distinct `(username, source)` pair
    /// is recorded once, in collaborator listing order.
    pub async fn resolve_permissions(
        &self,
        org: &str,
        repo: &RawRepository,
    ) -> Vec<PermissionEntry> {
        let owner = owner_of(repo, org);
        let name = repo.name.as_str();

        let collaborators = match self.source.list_collaborators(owner, name).await {
            Ok(c) => c,
            Err(e) => {
                degraded(name, "collaborators", &e);
                return Vec::new();
            }
        };

        let team_of = self.team_memberships(org, owner, name).await;

        let mut seen = HashSet::new();
        let mut permissions = Vec::new();
        for login in collaborators {
            if login.is_empty() {
                debug!(repository = %name, "skipping collaborator with empty login");
                continue;
            }
            let role = match self.source.permission_level(owner, name, &login).await {
                Ok(role) => role,
                Err(e) => {
                    degraded(name, "permission level", &e);
                    continue;
                }
            };
            let source = match team_of.get(&login) {
                Some(slug) => PermissionSource::Team(slug.clone()),
                None => PermissionSource::User,
            };
            if !seen.insert((login.clone(), source.clone())) {
                continue;
            }
            // login is non-empty, so this cannot fail
            if let Ok(entry) = PermissionEntry::new(login, role, source) {
                permissions.push(entry);
            }
        }
        permissions
    }

    /// username -> team slug for every team with access. The first team that
    /// lists a user wins.
    async fn team_memberships(&self, org: &str, owner: &str, repo: &str) -> HashMap<String, String> {
        let mut team_of = HashMap::new();
        let teams = match self.source.list_repository_teams(owner, repo).await {
            Ok(t) => t,
            Err(e) => {
                degraded(repo, "teams", &e);
                return team_of;
            }
        };
        for slug in teams.into_iter().filter(|s| !s.is_empty()) {
            match self.source.list_team_members(org, &slug).await {
                Ok(members) => {
                    for member in members {
                        team_of.entry(member).or_insert_with(|| slug.clone());
                    }
                }
                Err(e) => degraded(repo, "team members", &e),
            }
        }
        team_of
    }
}

/// Map a provider repository plus resolved permissions onto an [`AccessRecord`].
pub fn normalize(repo: &RawRepository, permissions: Vec<PermissionEntry>) -> AccessRecord {
    AccessRecord {
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        owner: repo.owner.login.clone(),
        visibility: repo.visibility.clone().unwrap_or_default(),
        private: repo.private,
        description: repo.description.clone().unwrap_or_default(),
        repo_url: repo.html_url.clone(),
        default_branch: repo.default_branch.clone().unwrap_or_default(),
        last_updated: repo.updated_at.clone().unwrap_or_default(),
        permissions,
        scan_result: None,
    }
}

fn owner_of<'a>(repo: &'a RawRepository, org: &'a str) -> &'a str {
    if repo.owner.login.is_empty() {
        org
    } else {
        &repo.owner.login
    }
}

fn degraded(repo: &str, what: &str, err: &FetchError) {
    METRICS.inc_fetch_degradations();
    emit_fetch_degraded(repo, what, err);
}
