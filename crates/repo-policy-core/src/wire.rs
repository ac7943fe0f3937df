//! JSON shapes exchanged between the scan daemon and its clients.
//!
//! Outcomes travel as plain labels (`"Success"`, `"Failure"` or the error
//! text) and are parsed back with [`resolve_label`] on arrival.

use serde::{Deserialize, Serialize};

use crate::domain::error::ScanError;
use crate::domain::record::{AccessRecord, PermissionEntry};
use crate::verdict::resolve_label;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub policy: String,
}

/// One repository as reported over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryReport {
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub visibility: String,
    pub private: bool,
    pub description: String,
    pub repo_url: String,
    pub default_branch: String,
    pub last_updated: String,
    pub permissions: Vec<PermissionEntry>,
    pub scan_result: String,
}

impl From<&AccessRecord> for RepositoryReport {
    fn from(record: &AccessRecord) -> Self {
        Self {
            name: record.name.clone(),
            full_name: record.full_name.clone(),
            owner: record.owner.clone(),
            visibility: record.visibility.clone(),
            private: record.private,
            description: record.description.clone(),
            repo_url: record.repo_url.clone(),
            default_branch: record.default_branch.clone(),
            last_updated: record.last_updated.clone(),
            permissions: record.permissions.clone(),
            scan_result: record
                .scan_result
                .as_ref()
                .map(|o| o.label().to_string())
                .unwrap_or_default(),
        }
    }
}

impl RepositoryReport {
    pub fn into_record(self) -> AccessRecord {
        let outcome = resolve_label(&self.scan_result);
        AccessRecord {
            name: self.name,
            full_name: self.full_name,
            owner: self.owner,
            visibility: self.visibility,
            private: self.private,
            description: self.description,
            repo_url: self.repo_url,
            default_branch: self.default_branch,
            last_updated: self.last_updated,
            permissions: self.permissions,
            scan_result: Some(outcome),
        }
    }
}

/// Response to a scan call. `error` is set when the scan failed as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub repositories: Vec<RepositoryReport>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanResponse {
    pub fn from_scan(scan: &Result<Vec<AccessRecord>, ScanError>) -> Self {
        match scan {
            Ok(records) => Self {
                repositories: records.iter().map(RepositoryReport::from).collect(),
                error: None,
            },
            Err(e) => Self {
                repositories: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Convert back into a scan result. A non-empty `error` wins over any
    /// repositories sent alongside it.
    pub fn into_scan(self) -> Result<Vec<AccessRecord>, ScanError> {
        match self.error {
            Some(message) if !message.is_empty() => Err(ScanError::Remote(message)),
            _ => Ok(self
                .repositories
                .into_iter()
                .map(RepositoryReport::into_record)
                .collect()),
        }
    }
}
