//! Policy file loading.
//!
//! Each path is either a policy file or a directory whose `*.rego` files are
//! loaded in file-name order. The returned list keeps command-line order.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyFileError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy file {0:?} is empty")]
    Empty(PathBuf),

    #[error("no policies found")]
    NoPolicies,
}

fn read(path: &Path) -> Result<String, PolicyFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| PolicyFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(PolicyFileError::Empty(path.to_path_buf()));
    }
    Ok(text)
}

fn rego_files(dir: &Path) -> Result<Vec<PathBuf>, PolicyFileError> {
    let entries = std::fs::read_dir(dir).map_err(|source| PolicyFileError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PolicyFileError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "rego") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every policy named by `paths`.
pub fn load_policies(paths: &[PathBuf]) -> Result<Vec<String>, PolicyFileError> {
    let mut policies = Vec::new();
    for path in paths {
        if path.is_dir() {
            for file in rego_files(path)? {
                policies.push(read(&file)?);
            }
        } else {
            policies.push(read(path)?);
        }
    }
    if policies.is_empty() {
        return Err(PolicyFileError::NoPolicies);
    }
    Ok(policies)
}
