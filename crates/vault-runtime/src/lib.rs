//! # Record Vault Runtime
//!
//! Process wiring for the vault core.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`vault-telemetry`)
//! 2. Load configuration from the environment
//! 3. Build the [`VaultContext`] (storage, lock, audit logger, backup engine,
//!    rate limiter)
//! 4. Serve until Ctrl-C
//! 5. Shut down: final audit flush, release the storage lock

pub mod container;

pub use container::{ConfigError, VaultConfig, VaultContext, VaultError};
