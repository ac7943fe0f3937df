//! Domain model: access records, outcomes, and the error taxonomy.

pub mod error;
pub mod outcome;
pub mod record;

pub use error::{FetchError, ScanError, ValidationError};
pub use outcome::{ScanOutcome, FAILURE_LABEL, SUCCESS_LABEL};
pub use record::{policy_digest, AccessRecord, PermissionEntry, PermissionSource};
