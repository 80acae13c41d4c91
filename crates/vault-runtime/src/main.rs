//! `vault-runtime` binary: owns the vault context for the life of the process.

use anyhow::{Context, Result};
use tracing::{error, info};
use vault_runtime::{VaultConfig, VaultContext};
use vault_telemetry::{init_logging, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _logging = init_logging(&TelemetryConfig::from_env()).context("logging setup failed")?;

    let config = VaultConfig::from_env().context("invalid environment configuration")?;
    let context = match VaultContext::initialize(config).await {
        Ok(context) => context,
        Err(e) => {
            error!(error = %e, class = %e.class(), "Vault failed to start");
            return Err(e).context("vault initialization failed");
        }
    };

    info!(
        root = %context.storage().root().display(),
        "Vault is running. Press Ctrl+C to stop."
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    context.shutdown().await.context("shutdown incomplete")?;
    Ok(())
}
