//! Policy oracle contract.
//!
//! The oracle is the external rule engine. The core only relies on this
//! contract: a policy document is loaded once, evaluated against one
//! [`AccessRecord`](crate::AccessRecord) input at a time, and yields a result
//! document from which a [`SignalSet`] is read.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the signal that grants access.
pub const ALLOW_SIGNAL: &str = "allow";
/// Name of the signal that revokes access; wins over [`ALLOW_SIGNAL`].
pub const DENY_SIGNAL: &str = "deny";

/// Failures surfaced by an oracle adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The policy document failed to parse or compile.
    #[error("failed to prepare policy: {0}")]
    Compile(String),

    /// The engine raised while evaluating.
    #[error("failed to evaluate policy: {0}")]
    Runtime(String),

    /// The engine answered with something that is not a signal map.
    #[error("invalid policy evaluation result format: {0}")]
    MalformedResult(String),

    #[error("policy evaluation timed out after {0:?}")]
    Timeout(Duration),

    #[error("policy oracle unavailable: {0}")]
    Unavailable(String),
}

/// A policy loaded into the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyHandle {
    /// Oracle-side identifier of the loaded policy.
    pub id: String,
    /// [`policy_digest`](crate::policy_digest) of the policy text.
    pub digest: String,
}

/// Raw result document of one evaluation. `None` means the engine produced no
/// result at all (e.g. the queried package is undefined).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OracleOutput {
    pub result: Option<Value>,
}

impl OracleOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result: Some(result),
        }
    }

    pub fn empty() -> Self {
        Self { result: None }
    }
}

/// External rule-evaluation engine.
#[async_trait]
pub trait PolicyOracle: Send + Sync {
    /// Handle that [`load`](Self::load) assigns to `policy`. Must be derived
    /// from the policy text alone so a load that never answered can still be
    /// released.
    fn handle_for(&self, policy: &str) -> PolicyHandle {
        let digest = crate::policy_digest(policy);
        PolicyHandle {
            id: digest[..16].to_string(),
            digest,
        }
    }

    /// Parse and compile `policy`, returning a handle for later evaluations.
    async fn load(&self, policy: &str) -> Result<PolicyHandle, OracleError>;

    /// Evaluate a loaded policy against one input document.
    async fn evaluate(&self, handle: &PolicyHandle, input: &Value)
        -> Result<OracleOutput, OracleError>;

    /// Release a loaded policy. Oracles without server-side state need not
    /// override this.
    async fn unload(&self, _handle: &PolicyHandle) -> Result<(), OracleError> {
        Ok(())
    }
}

/// The named boolean signals read from an oracle result.
///
/// Each signal is independently present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalSet {
    pub allow: Option<bool>,
    pub deny: Option<bool>,
}

impl SignalSet {
    /// Read the signals out of a raw result document.
    ///
    /// A missing result, a non-map result, or a signal bound to a non-boolean
    /// value is rejected as [`OracleError::MalformedResult`]. A `null` signal
    /// counts as absent.
    pub fn from_output(output: &OracleOutput) -> Result<Self, OracleError> {
        let result = output
            .result
            .as_ref()
            .ok_or_else(|| OracleError::MalformedResult("empty result set".to_string()))?;
        let map = result.as_object().ok_or_else(|| {
            OracleError::MalformedResult(format!("expected a map, got {}", kind_of(result)))
        })?;
        Ok(Self {
            allow: read_signal(map, ALLOW_SIGNAL)?,
            deny: read_signal(map, DENY_SIGNAL)?,
        })
    }
}

fn read_signal(
    map: &serde_json::Map<String, Value>,
    name: &str,
) -> Result<Option<bool>, OracleError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(OracleError::MalformedResult(format!(
            "signal '{name}' is {}, expected boolean",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
