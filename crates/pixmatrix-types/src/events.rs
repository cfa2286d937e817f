use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::correction::CorrectionParams;

/// High-level message kinds emitted by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Lifecycle,
    Store,
    Correction,
    Scheduler,
    Broadcast,
}

/// Immutable event envelope for logging and observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Lifecycle(LifecycleEvent),
    Store(StoreEvent),
    Correction(CorrectionParams),
    Scheduler(SchedulerEvent),
    Broadcast(BroadcastEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub phase: LifecyclePhase,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecyclePhase {
    Boot,
    Ready,
    Shutdown,
}

/// Frame store state after a mutation or undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    pub action: String,
    pub generation: usize,
    pub history_len: usize,
    pub frames: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchedulerEvent {
    pub running: bool,
    pub fps: u32,
    pub broadcast: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Animation frame that was sent, `None` for an explicit send of the edit surface.
    pub frame_index: Option<usize>,
    pub bytes: usize,
    pub delivered: bool,
}

impl SessionEvent {
    pub fn new(payload: EventPayload) -> Self {
        let kind = match &payload {
            EventPayload::Lifecycle(_) => EventKind::Lifecycle,
            EventPayload::Store(_) => EventKind::Store,
            EventPayload::Correction(_) => EventKind::Correction,
            EventPayload::Scheduler(_) => EventKind::Scheduler,
            EventPayload::Broadcast(_) => EventKind::Broadcast,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn lifecycle(phase: LifecyclePhase, details: Option<String>) -> Self {
        Self::new(EventPayload::Lifecycle(LifecycleEvent {
            phase,
            details,
        }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
