//! Canonical per-repository snapshot handed to the policy oracle.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ValidationError;
use super::outcome::ScanOutcome;

const TEAM_PREFIX: &str = "team:";

/// How a collaborator reaches a repository.
///
/// Serialized as the literal `"user"` or `"team:<slug>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PermissionSource {
    /// Direct collaborator.
    User,
    /// Member of the team with this slug.
    Team(String),
}

impl PermissionSource {
    pub fn team(slug: impl Into<String>) -> Result<Self, ValidationError> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(ValidationError::EmptyTeamSlug);
        }
        Ok(Self::Team(slug))
    }
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionSource::User => f.write_str("user"),
            PermissionSource::Team(slug) => write!(f, "{TEAM_PREFIX}{slug}"),
        }
    }
}

impl TryFrom<String> for PermissionSource {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "user" {
            return Ok(Self::User);
        }
        match value.strip_prefix(TEAM_PREFIX) {
            Some(slug) => Self::team(slug),
            None => Err(ValidationError::InvalidSource(value)),
        }
    }
}

impl From<PermissionSource> for String {
    fn from(source: PermissionSource) -> Self {
        source.to_string()
    }
}

/// One collaborator's effective role on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub username: String,
    /// Free-form provider role label (`admin`, `write`, `maintain`, ...).
    pub role: String,
    pub source: PermissionSource,
}

impl PermissionEntry {
    pub fn new(
        username: impl Into<String>,
        role: impl Into<String>,
        source: PermissionSource,
    ) -> Result<Self, ValidationError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        Ok(Self {
            username,
            role: role.into(),
            source,
        })
    }
}

/// One repository's access snapshot at scan time.
///
/// # Invariants
///
/// The record is fully built (identity and permissions resolved) before it
/// reaches the oracle. `visibility` and `private` come straight from the
/// provider and are never derived from one another.
///
/// `scan_result` is never part of the oracle input; it is written only after
/// the verdict for this record has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessRecord {
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub visibility: String,
    pub private: bool,
    pub description: String,
    pub repo_url: String,
    pub default_branch: String,
    /// Provider timestamp, kept as the provider formatted it.
    pub last_updated: String,
    pub permissions: Vec<PermissionEntry>,
    #[serde(skip)]
    pub scan_result: Option<ScanOutcome>,
}

impl AccessRecord {
    /// Check the shape invariants that hold for every record fed to the oracle.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        for entry in &self.permissions {
            if entry.username.is_empty() {
                return Err(ValidationError::EmptyUsername);
            }
            if matches!(&entry.source, PermissionSource::Team(slug) if slug.is_empty()) {
                return Err(ValidationError::EmptyTeamSlug);
            }
        }
        Ok(())
    }

    /// The structured document the oracle evaluates as `input`.
    pub fn policy_input(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Name used in logs and summaries; falls back to `name` when the provider
    /// omitted the full name.
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.name
        } else {
            &self.full_name
        }
    }
}

/// Stable hex digest of a policy document, ignoring surrounding whitespace.
pub fn policy_digest(policy: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(policy.trim().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AccessRecord {
        AccessRecord {
            name: "api".to_string(),
            full_name: "acme/api".to_string(),
            owner: "acme".to_string(),
            visibility: "private".to_string(),
            private: true,
            permissions: vec![
                PermissionEntry::new("alice", "admin", PermissionSource::User).unwrap(),
                PermissionEntry::new("bob", "write", PermissionSource::team("core").unwrap())
                    .unwrap(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_permission_source_serializes_as_label() {
        let json = serde_json::to_value(&record().permissions).unwrap();
        assert_eq!(json[0]["source"], "user");
        assert_eq!(json[1]["source"], "team:core");
    }

    #[test]
    fn test_permission_source_rejects_bare_team_prefix() {
        let err = PermissionSource::try_from("team:".to_string()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyTeamSlug);
    }

    #[test]
    fn test_permission_source_rejects_unknown_label() {
        let err = serde_json::from_str::<PermissionSource>("\"org\"").unwrap_err();
        assert!(err.to_string().contains("unrecognized permission source"));
    }

    #[test]
    fn test_permission_entry_requires_username() {
        let err = PermissionEntry::new("", "read", PermissionSource::User).unwrap_err();
        assert_eq!(err, ValidationError::EmptyUsername);
    }

    #[test]
    fn test_policy_input_omits_scan_result() {
        let mut rec = record();
        rec.scan_result = Some(ScanOutcome::Allowed);
        let input = rec.policy_input().unwrap();
        let obj = input.as_object().unwrap();
        assert!(!obj.contains_key("scan_result"));
        assert_eq!(obj["visibility"], "private");
        assert_eq!(obj["private"], true);
        assert_eq!(obj["permissions"][0]["role"], "admin");
    }

    #[test]
    fn test_validate_flags_empty_name() {
        let rec = AccessRecord::default();
        assert_eq!(rec.validate(), Err(ValidationError::MissingName));
        assert!(record().validate().is_ok());
    }

    #[test]
    fn test_policy_digest_ignores_surrounding_whitespace() {
        let a = policy_digest("package repository\n");
        let b = policy_digest("\n\tpackage repository");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, policy_digest("package other"));
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let rec = AccessRecord {
            name: "solo".to_string(),
            ..Default::default()
        };
        assert_eq!(rec.display_name(), "solo");
        assert_eq!(record().display_name(), "acme/api");
    }
}
