//! Archive event types, envelope, and event bus.
//!
//! The archive engine reports what it did through this bus instead of
//! printing. Events are narration only: an operation's outcome is its return
//! value, and a missing or lagging subscriber never affects it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{ArchiveOperation, EntityKind, RetentionReport};

// ============================================================================
// Event Envelope
// ============================================================================

/// Wrapper carrying identity and timing for every archive event.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g. `"archive.completed"`).
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Acting user, absent for automated actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<i32>,
    pub payload: ArchiveEvent,
}

impl ArchiveEventEnvelope {
    pub fn new(event: ArchiveEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            actor_id: event.actor_id(),
            payload: event,
        }
    }
}

// ============================================================================
// Archive Event (payloads)
// ============================================================================

/// Something the archive subsystem did or refused to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ArchiveEvent {
    /// A record moved between live and archive tables, or was purged.
    TransitionCompleted {
        kind: EntityKind,
        record_id: i32,
        operation: ArchiveOperation,
        actor_id: Option<i32>,
        log_id: i64,
    },
    /// A transition was not applied; nothing was written.
    TransitionRejected {
        kind: EntityKind,
        record_id: i32,
        operation: ArchiveOperation,
        actor_id: Option<i32>,
        detail: String,
    },
    /// A profile row was flagged archived in place by a role change.
    ProfileFlagged { kind: EntityKind, username: String },
    /// A retention pass finished.
    RetentionCompleted { report: RetentionReport },
}

impl ArchiveEvent {
    /// Namespaced event type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            ArchiveEvent::TransitionCompleted { operation, .. } => match operation {
                ArchiveOperation::Archive => "archive.completed",
                ArchiveOperation::Restore => "restore.completed",
                ArchiveOperation::PermanentDelete => "permanent_delete.completed",
            },
            ArchiveEvent::TransitionRejected { operation, .. } => match operation {
                ArchiveOperation::Archive => "archive.rejected",
                ArchiveOperation::Restore => "restore.rejected",
                ArchiveOperation::PermanentDelete => "permanent_delete.rejected",
            },
            ArchiveEvent::ProfileFlagged { .. } => "profile.flagged",
            ArchiveEvent::RetentionCompleted { .. } => "retention.completed",
        }
    }

    fn actor_id(&self) -> Option<i32> {
        match self {
            ArchiveEvent::TransitionCompleted { actor_id, .. }
            | ArchiveEvent::TransitionRejected { actor_id, .. } => *actor_id,
            _ => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast bus for archive events.
#[derive(Debug, Clone)]
pub struct ArchiveEventBus {
    tx: broadcast::Sender<ArchiveEventEnvelope>,
}

impl ArchiveEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: ArchiveEvent) {
        let envelope = ArchiveEventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "ArchiveEventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArchiveEventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ArchiveEventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
