//! Command handlers.
//!
//! Mutating commands go through a full [`VaultContext`], so they hold the
//! storage lock and their audit entries are flushed before exit. Read-only
//! commands build just the engine they need and never take the lock.

use crate::cli::{backup_options, AuditCommand, BackupCommand, Cli, Command};
use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use rv_03_backup::{BackupEngine, BackupSummary, VerifyReport};
use rv_04_audit_log::{AuditLogEntry, AuditLogger, AuditQuery};
use shared_types::NoopAuditSink;
use std::sync::Arc;
use vault_runtime::{VaultConfig, VaultContext};

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = VaultConfig::from_env().context("invalid environment configuration")?;
    if let Some(root) = &cli.root {
        config.storage.root = root.clone();
    }

    match &cli.command {
        Command::Backup(cmd) => backup(&cli, config, cmd).await,
        Command::Audit(cmd) => audit(&cli, config, cmd).await,
    }
}

async fn backup(cli: &Cli, config: VaultConfig, cmd: &BackupCommand) -> Result<()> {
    let actor = cli.actor();
    match cmd {
        BackupCommand::List => {
            let backups = read_only_engine(&config).list_backups().await?;
            if cli.json {
                let rows: Vec<_> = backups.iter().map(summary_json).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if backups.is_empty() {
                println!("No backups in {}", config.backup_config(&config.storage.root).backup_dir.display());
            } else {
                for summary in &backups {
                    print_summary(summary);
                }
            }
        }
        BackupCommand::Verify { id } => {
            let report = read_only_engine(&config).verify_backup(id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&verify_json(&report))?);
            } else {
                print_verify(&report);
            }
            if !report.is_valid() {
                bail!("{} entries in {} could not be decoded", report.decode_errors.len(), report.id);
            }
        }
        BackupCommand::Create {
            description,
            exclude,
            no_config,
        } => {
            let options = backup_options(description.clone(), exclude, *no_config);
            let ctx = VaultContext::initialize(config).await?;
            let result = ctx.backups().create_backup(&actor, options).await;
            ctx.shutdown().await?;
            let id = result?;
            if cli.json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("Created {id}");
            }
        }
        BackupCommand::Restore { id, flags } => {
            let ctx = VaultContext::initialize(config).await?;
            let result = ctx.backups().restore_backup(&actor, id, flags.options()).await;
            ctx.shutdown().await?;
            let report = result?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "backupId": report.backup_id,
                        "restored": report.restored,
                        "filesWritten": report.files_written,
                        "preRestoreBackup": report.pre_restore_backup,
                        "errors": report.errors,
                    }))?
                );
            } else {
                println!(
                    "Restored {} ({} files): {}",
                    report.backup_id,
                    report.files_written,
                    report.restored.join(", ")
                );
                if let Some(safety) = &report.pre_restore_backup {
                    println!("Pre-restore backup: {safety}");
                }
                for error in &report.errors {
                    println!("  error: {error}");
                }
            }
            if !report.is_complete() {
                bail!("{} files could not be restored", report.errors.len());
            }
        }
        BackupCommand::Delete { id } => {
            let ctx = VaultContext::initialize(config).await?;
            let result = ctx.backups().delete_backup(&actor, id).await;
            ctx.shutdown().await?;
            result?;
            if !cli.json {
                println!("Deleted {id}");
            }
        }
    }
    Ok(())
}

async fn audit(cli: &Cli, config: VaultConfig, cmd: &AuditCommand) -> Result<()> {
    let AuditCommand::Show {
        date,
        user,
        action,
        min_severity,
        failed,
        limit,
    } = cmd;

    // Never started: no flush task, nothing buffered, reads only.
    let logger = AuditLogger::with_system_clock(config.audit_config(&config.storage.root));
    let query = AuditQuery {
        user_id: user.clone(),
        action: *action,
        min_severity: *min_severity,
        success: failed.then_some(false),
        limit: *limit,
    };
    let entries = logger.query(*date, &query).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No matching entries for {date}");
    } else {
        for entry in &entries {
            print_entry(entry);
        }
    }
    Ok(())
}

fn read_only_engine(config: &VaultConfig) -> BackupEngine {
    BackupEngine::with_system_clock(
        config.backup_config(&config.storage.root),
        Arc::new(NoopAuditSink),
    )
}

fn summary_json(summary: &BackupSummary) -> serde_json::Value {
    serde_json::json!({
        "id": summary.id,
        "fileName": summary.file_name,
        "sizeBytes": summary.size_bytes,
        "metadata": summary.metadata,
    })
}

fn print_summary(summary: &BackupSummary) {
    match &summary.metadata {
        Some(meta) => println!(
            "{:<40} {:>12}  {}  {}",
            summary.id,
            summary.size_bytes,
            meta.included_paths.join(","),
            meta.description
        ),
        None => println!("{:<40} {:>12}  (unreadable)", summary.id, summary.size_bytes),
    }
}

fn verify_json(report: &VerifyReport) -> serde_json::Value {
    let areas: serde_json::Map<_, _> = report
        .areas
        .iter()
        .map(|(name, stats)| {
            (
                name.clone(),
                serde_json::json!({
                    "directories": stats.directories,
                    "jsonFiles": stats.json_files,
                    "binaryFiles": stats.binary_files,
                    "binaryBytes": stats.binary_bytes,
                }),
            )
        })
        .collect();
    serde_json::json!({
        "id": report.id,
        "valid": report.is_valid(),
        "metadata": report.metadata,
        "areas": areas,
        "userFiles": report.data.map(|d| d.files()),
        "configFiles": report.config_files,
        "totalFiles": report.total_files(),
        "decodeErrors": report.decode_errors,
    })
}

fn print_verify(report: &VerifyReport) {
    println!("{} ({})", report.id, report.metadata.timestamp);
    println!("  description: {}", report.metadata.description);
    for (name, stats) in &report.areas {
        println!(
            "  {name:<10} {} files ({} binary, {} bytes)",
            stats.files(),
            stats.binary_files,
            stats.binary_bytes
        );
    }
    if let Some(data) = &report.data {
        println!("  {:<10} {} files", "users", data.files());
    }
    if !report.config_files.is_empty() {
        println!("  config:    {}", report.config_files.join(", "));
    }
    for skipped in &report.metadata.skipped_paths {
        println!("  not captured: {skipped}");
    }
    for error in &report.decode_errors {
        println!("  undecodable: {error}");
    }
    println!(
        "  {}: {} files",
        if report.is_valid() { "OK" } else { "DAMAGED" },
        report.total_files()
    );
}

fn print_entry(entry: &AuditLogEntry) {
    let outcome = match &entry.error {
        Some(error) => format!("FAILED: {error}"),
        None if entry.success => "ok".to_string(),
        None => "FAILED".to_string(),
    };
    println!(
        "{} {:<8} {:<24} {}/{} {} {}",
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        entry.severity.as_str(),
        entry.action.as_str(),
        entry.resource,
        entry.resource_id.as_deref().unwrap_or("-"),
        entry.username,
        outcome
    );
}
