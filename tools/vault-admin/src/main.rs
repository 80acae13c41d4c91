//! Vault-Admin: operator CLI for backups and the audit trail.
//!
//! ```text
//! vault-admin --root /srv/vault backup create -d "before term start"
//! vault-admin backup list
//! vault-admin backup restore backup-2024-03-05T10-20-30-123Z --include-logs
//! vault-admin audit show --date 2024-03-05 --min-severity high
//! ```

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use vault_telemetry::{init_logging, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    telemetry.service_name = "vault-admin".to_string();
    if env::var_os("VAULT_LOG_LEVEL").is_none() && env::var_os("RUST_LOG").is_none() {
        telemetry.log_level = "warn".to_string();
    }
    let _logging = init_logging(&telemetry).context("logging setup failed")?;

    commands::run(cli).await
}
