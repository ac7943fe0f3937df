//! Repository policy scan daemon
//!
//! Serves one remote call, `POST /v1/scan`, that evaluates a policy document
//! against the current snapshot of the configured organization.

pub mod config;
pub mod server;
pub mod startup;

pub use config::{ConfigError, DaemonArgs, DaemonConfig};
pub use server::{build_router, serve, shutdown_signal};
pub use startup::run_startup_scan;
