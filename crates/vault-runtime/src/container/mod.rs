//! # Vault Container
//!
//! Configuration plus the context holding every service instance, with
//! explicit start and stop instead of module-level singletons.

pub mod config;
pub mod context;

pub use config::{ConfigError, VaultConfig};
pub use context::{VaultContext, VaultError};
