//! # Audit Logger Service
//!
//! ## Flush Triggers
//!
//! | Trigger | Where the flush runs |
//! |---------|----------------------|
//! | critical entry | inline, before `log` returns |
//! | buffer reaches `max_buffer_entries` | background task (signalled) |
//! | `flush_interval` tick | background task |
//! | `shutdown` | inline, after the task has stopped |
//!
//! Flushes are serialised; append order is preserved in the files. A batch
//! that fails to write goes back to the front of the buffer for the next
//! attempt.

mod writer;

use crate::domain::config::AuditConfig;
use crate::domain::entry::AuditLogEntry;
use crate::domain::errors::AuditError;
use crate::domain::query::AuditQuery;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use shared_types::{
    AuditAction, AuditEvent, AuditOptions, AuditSink, Clock, Severity, SystemClock,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Process-wide buffered audit logger.
///
/// Construct once, wrap in an `Arc`, call [`AuditLogger::start`] and hand it
/// to collaborators as an [`AuditSink`].
pub struct AuditLogger {
    config: AuditConfig,
    clock: Arc<dyn Clock>,
    buffer: Mutex<VecDeque<AuditLogEntry>>,
    flush_lock: tokio::sync::Mutex<()>,
    flush_requested: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AuditLogger {
    pub fn new(config: AuditConfig, clock: Arc<dyn Clock>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            clock,
            buffer: Mutex::new(VecDeque::new()),
            flush_lock: tokio::sync::Mutex::new(()),
            flush_requested: Arc::new(Notify::new()),
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub fn with_system_clock(config: AuditConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Spawn the background flush task. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.task.lock();
        if slot.is_some() {
            return;
        }

        let logger = Arc::downgrade(self);
        let flush_requested = Arc::clone(&self.flush_requested);
        let mut shutdown = self.shutdown.subscribe();
        let period = self.config.flush_interval;

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = flush_requested.notified() => {}
                    _ = shutdown.changed() => break,
                }
                let Some(logger) = logger.upgrade() else {
                    break;
                };
                if let Err(e) = logger.flush().await {
                    warn!(error = %e, pending = logger.pending(), "Audit flush failed, will retry");
                }
            }
            debug!("Audit flush task stopped");
        }));
        info!(interval = ?period, dir = %self.config.log_dir.display(), "Audit logger started");
    }

    /// Record one entry.
    ///
    /// Critical entries are on disk when this returns; if that write fails the
    /// entry stays buffered and the failure is logged. Other entries wait for
    /// the next flush.
    pub async fn log(
        &self,
        user_id: &str,
        username: &str,
        action: AuditAction,
        resource: &str,
        options: AuditOptions,
    ) -> AuditLogEntry {
        let event = AuditEvent {
            user_id: user_id.to_string(),
            username: username.to_string(),
            action,
            resource: resource.to_string(),
            options,
        };
        self.append(event).await
    }

    async fn append(&self, event: AuditEvent) -> AuditLogEntry {
        let entry = AuditLogEntry::from_event(event, self.clock.now());
        let buffered = {
            let mut buffer = self.buffer.lock();
            buffer.push_back(entry.clone());
            buffer.len()
        };

        if entry.severity == Severity::Critical {
            if let Err(e) = self.flush().await {
                error!(error = %e, id = %entry.id, "Critical audit entry not persisted, kept for retry");
            }
        } else if buffered >= self.config.max_buffer_entries {
            self.flush_requested.notify_one();
        }
        entry
    }

    /// Write every buffered entry. Returns how many were written.
    pub async fn flush(&self) -> Result<usize, AuditError> {
        let _serialised = self.flush_lock.lock().await;
        let batch: Vec<AuditLogEntry> = self.buffer.lock().drain(..).collect();
        if batch.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        while written < batch.len() {
            let date = batch[written].date();
            let run = batch[written..]
                .iter()
                .take_while(|e| e.date() == date)
                .count();
            let chunk = &batch[written..written + run];

            if let Err(e) = writer::append(
                &self.config.log_dir,
                date,
                chunk,
                self.config.max_file_bytes,
                self.clock.now_ms(),
            )
            .await
            {
                self.requeue(batch[written..].to_vec());
                return Err(e);
            }
            written += run;
        }
        debug!(count = written, "Audit entries flushed");
        Ok(written)
    }

    /// Put unwritten entries back ahead of anything logged meanwhile.
    fn requeue(&self, entries: Vec<AuditLogEntry>) {
        let mut buffer = self.buffer.lock();
        for entry in entries.into_iter().rev() {
            buffer.push_front(entry);
        }
    }

    /// Entries waiting to be written.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Stop the background task and perform the final flush.
    pub async fn shutdown(&self) -> Result<usize, AuditError> {
        self.shutdown.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Audit flush task ended abnormally");
            }
        }
        let written = self.flush().await?;
        info!(flushed = written, "Audit logger shut down");
        Ok(written)
    }

    /// Persisted entries for `date` in write order. Buffered entries are not
    /// included until flushed.
    pub async fn read_entries(&self, date: NaiveDate) -> Result<Vec<AuditLogEntry>, AuditError> {
        writer::read_day(&self.config.log_dir, date).await
    }

    /// Persisted entries for `date` matching `query`, newest first.
    pub async fn query(
        &self,
        date: NaiveDate,
        query: &AuditQuery,
    ) -> Result<Vec<AuditLogEntry>, AuditError> {
        Ok(query.apply(self.read_entries(date).await?))
    }
}

#[async_trait]
impl AuditSink for AuditLogger {
    async fn record(&self, event: AuditEvent) {
        self.append(event).await;
    }
}
