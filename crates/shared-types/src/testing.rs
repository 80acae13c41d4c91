//! # Test Doubles
//!
//! In-memory implementations of the shared ports for unit and integration tests.

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Sink that keeps every recorded event in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events in arrival order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Recorded events with the given action.
    pub fn with_action(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Actor, AuditOptions};

    #[tokio::test]
    async fn test_recording_sink_keeps_order() {
        let sink = RecordingAuditSink::new();
        let actor = Actor::new("u-1", "alice");

        sink.record(AuditEvent::new(&actor, AuditAction::Login, "auth", AuditOptions::default()))
            .await;
        sink.record(AuditEvent::new(&actor, AuditAction::Logout, "auth", AuditOptions::default()))
            .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::Login);
        assert_eq!(sink.with_action(AuditAction::Logout).len(), 1);
    }
}
