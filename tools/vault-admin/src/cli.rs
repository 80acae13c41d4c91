//! Command-line surface.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rv_03_backup::{BackupArea, BackupOptions, RestoreOptions};
use shared_types::{Actor, AuditAction, Severity};
use std::path::PathBuf;

/// Vault-Admin: backup and audit-log operations on a vault storage root
#[derive(Parser, Debug)]
#[command(name = "vault-admin")]
#[command(about = "Operator CLI for record vault backups and audit logs")]
pub struct Cli {
    /// Storage root (overrides VAULT_STORAGE_ROOT)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Operator id recorded in the audit trail
    #[arg(long, global = true, default_value = "admin")]
    pub actor_id: String,

    /// Operator name recorded in the audit trail
    #[arg(long, global = true, default_value = "admin")]
    pub actor_name: String,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor_id.clone(), self.actor_name.clone())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Snapshot management
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Audit trail inspection
    #[command(subcommand)]
    Audit(AuditCommand),
}

#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    /// Take a snapshot now
    Create {
        #[arg(short, long, default_value = "Manual backup")]
        description: String,

        /// Area to leave out (students, events, media, logs, users); repeatable
        #[arg(long, value_parser = parse_area)]
        exclude: Vec<BackupArea>,

        /// Leave configuration files out
        #[arg(long)]
        no_config: bool,
    },

    /// List snapshots, newest first
    List,

    /// Parse and check a snapshot without restoring it
    Verify { id: String },

    /// Replay a snapshot onto the storage root
    Restore {
        id: String,

        #[command(flatten)]
        flags: RestoreFlags,
    },

    /// Remove a snapshot
    Delete { id: String },
}

#[derive(Args, Debug, Default)]
pub struct RestoreFlags {
    /// Area to leave untouched; repeatable
    #[arg(long, value_parser = parse_area)]
    pub exclude: Vec<BackupArea>,

    /// Also replay the logs area
    #[arg(long)]
    pub include_logs: bool,

    /// Do not overwrite configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Skip the safety snapshot of the current state
    #[arg(long)]
    pub skip_pre_restore_backup: bool,

    /// Merge into existing areas instead of clearing them first
    #[arg(long)]
    pub keep_existing: bool,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show one day's entries, newest first
    Show {
        /// Day to read (YYYY-MM-DD, UTC)
        #[arg(short, long)]
        date: NaiveDate,

        /// Only this user id
        #[arg(short, long)]
        user: Option<String>,

        /// Only this action (e.g. student_deleted)
        #[arg(short, long)]
        action: Option<AuditAction>,

        /// Only entries at or above this severity
        #[arg(short = 's', long)]
        min_severity: Option<Severity>,

        /// Only failed outcomes
        #[arg(long)]
        failed: bool,

        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn parse_area(raw: &str) -> Result<BackupArea, String> {
    BackupArea::from_name(raw).ok_or_else(|| {
        let known: Vec<_> = BackupArea::ALL.iter().map(|a| a.as_str()).collect();
        format!("unknown area {raw:?} (expected one of {})", known.join(", "))
    })
}

pub fn backup_options(description: String, exclude: &[BackupArea], no_config: bool) -> BackupOptions {
    let mut options = BackupOptions::described(description);
    for area in exclude {
        match area {
            BackupArea::Students => options.students = false,
            BackupArea::Events => options.events = false,
            BackupArea::Media => options.media = false,
            BackupArea::Logs => options.logs = false,
            BackupArea::Users => options.users = false,
        }
    }
    options.config = !no_config;
    options
}

impl RestoreFlags {
    pub fn options(&self) -> RestoreOptions {
        let mut options = RestoreOptions {
            logs: self.include_logs,
            config: !self.no_config,
            skip_pre_restore_backup: self.skip_pre_restore_backup,
            replace_existing: !self.keep_existing,
            ..RestoreOptions::default()
        };
        for area in &self.exclude {
            match area {
                BackupArea::Students => options.students = false,
                BackupArea::Events => options.events = false,
                BackupArea::Media => options.media = false,
                BackupArea::Logs => options.logs = false,
                BackupArea::Users => options.users = false,
            }
        }
        options
    }
}
