//! # Vault Telemetry
//!
//! Logging setup shared by the vault binaries. Library crates only emit
//! `tracing` events; this crate decides where they go.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let _logging = vault_telemetry::init_logging(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `VAULT_LOG_LEVEL` | `RUST_LOG`, then `info` | `EnvFilter` directive |
//! | `VAULT_JSON_LOGS` | `true` in containers | JSON lines output |
//! | `VAULT_SERVICE_NAME` | `record-vault` | Service span name |

mod config;
mod logging;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter {directive:?}: {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
