//! In-memory fakes for the provider, oracle, and scan traits (testing only)
//!
//! Provides `MemoryRepositorySource`, `ScriptedOracle`, and `MemoryPolicyScan`
//! that satisfy the trait contracts without any network access.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::builder::{RawRepository, RepositorySource};
use crate::domain::error::{FetchError, ScanError};
use crate::domain::record::{policy_digest, AccessRecord};
use crate::oracle::{OracleError, OracleOutput, PolicyHandle, PolicyOracle};
use crate::runner::PolicyScan;

// ---------------------------------------------------------------------------
// MemoryRepositorySource
// ---------------------------------------------------------------------------

/// Provider backed by in-memory maps keyed by repository name.
#[derive(Debug, Default)]
pub struct MemoryRepositorySource {
    repositories: Vec<RawRepository>,
    collaborators: HashMap<String, Vec<(String, String)>>,
    teams: HashMap<String, Vec<String>>,
    members: HashMap<String, Vec<String>>,
    fail_listing: bool,
    fail_details: HashSet<String>,
    fail_collaborators: HashSet<String>,
    fail_teams: HashSet<String>,
    fail_members: HashSet<String>,
    fail_permissions: HashSet<(String, String)>,
}

impl MemoryRepositorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repo: RawRepository) -> Self {
        self.repositories.push(repo);
        self
    }

    pub fn with_collaborator(mut self, repo: &str, login: &str, role: &str) -> Self {
        self.collaborators
            .entry(repo.to_string())
            .or_default()
            .push((login.to_string(), role.to_string()));
        self
    }

    /// Grant `slug` access to `repo` and set its member list.
    pub fn with_team(mut self, repo: &str, slug: &str, members: &[&str]) -> Self {
        self.teams
            .entry(repo.to_string())
            .or_default()
            .push(slug.to_string());
        self.members.insert(
            slug.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_details(mut self, repo: &str) -> Self {
        self.fail_details.insert(repo.to_string());
        self
    }

    pub fn failing_collaborators(mut self, repo: &str) -> Self {
        self.fail_collaborators.insert(repo.to_string());
        self
    }

    pub fn failing_teams(mut self, repo: &str) -> Self {
        self.fail_teams.insert(repo.to_string());
        self
    }

    pub fn failing_team_members(mut self, slug: &str) -> Self {
        self.fail_members.insert(slug.to_string());
        self
    }

    pub fn failing_permission(mut self, repo: &str, login: &str) -> Self {
        self.fail_permissions
            .insert((repo.to_string(), login.to_string()));
        self
    }

    fn unavailable(what: &str) -> FetchError {
        FetchError::Transport(format!("{what} unavailable"))
    }
}

#[async_trait]
impl RepositorySource for MemoryRepositorySource {
    async fn list_repositories(&self, _org: &str) -> Result<Vec<RawRepository>, FetchError> {
        if self.fail_listing {
            return Err(Self::unavailable("repository listing"));
        }
        Ok(self.repositories.clone())
    }

    async fn get_repository(&self, _owner: &str, name: &str) -> Result<RawRepository, FetchError> {
        if self.fail_details.contains(name) {
            return Err(Self::unavailable("repository details"));
        }
        self.repositories
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(name.to_string()))
    }

    async fn list_collaborators(&self, _owner: &str, repo: &str) -> Result<Vec<String>, FetchError> {
        if self.fail_collaborators.contains(repo) {
            return Err(Self::unavailable("collaborators"));
        }
        Ok(self
            .collaborators
            .get(repo)
            .map(|c| c.iter().map(|(login, _)| login.clone()).collect())
            .unwrap_or_default())
    }

    async fn list_repository_teams(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Vec<String>, FetchError> {
        if self.fail_teams.contains(repo) {
            return Err(Self::unavailable("teams"));
        }
        Ok(self.teams.get(repo).cloned().unwrap_or_default())
    }

    async fn list_team_members(&self, _org: &str, slug: &str) -> Result<Vec<String>, FetchError> {
        if self.fail_members.contains(slug) {
            return Err(Self::unavailable("team members"));
        }
        Ok(self.members.get(slug).cloned().unwrap_or_default())
    }

    async fn permission_level(
        &self,
        _owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<String, FetchError> {
        if self
            .fail_permissions
            .contains(&(repo.to_string(), username.to_string()))
        {
            return Err(Self::unavailable("permission level"));
        }
        self.collaborators
            .get(repo)
            .and_then(|c| c.iter().find(|(login, _)| login == username))
            .map(|(_, role)| role.clone())
            .ok_or_else(|| FetchError::NotFound(format!("{repo}/{username}")))
    }
}

// ---------------------------------------------------------------------------
// ScriptedOracle
// ---------------------------------------------------------------------------

type Decide = dyn Fn(&Value) -> Result<OracleOutput, OracleError> + Send + Sync;

/// Oracle whose evaluation is a closure over the input document.
pub struct ScriptedOracle {
    decide: Box<Decide>,
    load_error: Option<OracleError>,
    load_delay: Option<Duration>,
    delay: Option<Duration>,
    evaluations: AtomicUsize,
    unloaded: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new<F>(decide: F) -> Self
    where
        F: Fn(&Value) -> Result<OracleOutput, OracleError> + Send + Sync + 'static,
    {
        Self {
            decide: Box::new(decide),
            load_error: None,
            load_delay: None,
            delay: None,
            evaluations: AtomicUsize::new(0),
            unloaded: Mutex::new(Vec::new()),
        }
    }

    /// Oracle that rejects every policy at load time.
    pub fn failing_load(err: OracleError) -> Self {
        let mut oracle = Self::new(|_| Ok(OracleOutput::empty()));
        oracle.load_error = Some(err);
        oracle
    }

    /// Sleep this long before answering each evaluation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep this long before accepting a policy.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    /// Handle ids released so far.
    pub fn unloaded(&self) -> Vec<String> {
        self.unloaded
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PolicyOracle for ScriptedOracle {
    fn handle_for(&self, policy: &str) -> PolicyHandle {
        let digest = policy_digest(policy);
        PolicyHandle {
            id: format!("scripted-{}", &digest[..12]),
            digest,
        }
    }

    async fn load(&self, policy: &str) -> Result<PolicyHandle, OracleError> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.load_error {
            return Err(err.clone());
        }
        Ok(self.handle_for(policy))
    }

    async fn evaluate(
        &self,
        _handle: &PolicyHandle,
        input: &Value,
    ) -> Result<OracleOutput, OracleError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.decide)(input)
    }

    async fn unload(&self, handle: &PolicyHandle) -> Result<(), OracleError> {
        if let Ok(mut ids) = self.unloaded.lock() {
            ids.push(handle.id.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryPolicyScan
// ---------------------------------------------------------------------------

/// Canned scan results keyed by trimmed policy text. Unknown policies answer
/// with an empty repository list.
#[derive(Debug, Default)]
pub struct MemoryPolicyScan {
    results: HashMap<String, Result<Vec<AccessRecord>, ScanError>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryPolicyScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(
        mut self,
        policy: &str,
        result: Result<Vec<AccessRecord>, ScanError>,
    ) -> Self {
        self.results.insert(policy.trim().to_string(), result);
        self
    }

    pub fn with_delay(mut self, policy: &str, delay: Duration) -> Self {
        self.delays.insert(policy.trim().to_string(), delay);
        self
    }

    /// Policies scanned so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Highest number of scans that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyScan for MemoryPolicyScan {
    async fn scan_policy(&self, policy: &str) -> Result<Vec<AccessRecord>, ScanError> {
        let key = policy.trim().to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.results.get(&key).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}
