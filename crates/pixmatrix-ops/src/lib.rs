//! Operational helpers: logging setup and in-memory session telemetry.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use pixmatrix_types::{
    config::OpsConfig,
    events::{EventKind, EventPayload, SessionEvent},
    PixmatrixError, Result,
};
use tokio::sync::Mutex;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| PixmatrixError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| PixmatrixError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Totals over every broadcast the session attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub attempted: u64,
    pub delivered: u64,
    pub bytes: u64,
}

/// Bounded in-memory event log. Oldest events are dropped once full; the
/// broadcast totals keep counting regardless.
#[derive(Clone)]
pub struct TelemetryStore {
    events: Arc<Mutex<VecDeque<SessionEvent>>>,
    broadcasts: Arc<Mutex<BroadcastStats>>,
    capacity: usize,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            broadcasts: Arc::new(Mutex::new(BroadcastStats::default())),
            capacity: capacity.max(1),
        }
    }

    pub async fn record_event(&self, event: SessionEvent) -> Result<()> {
        if let EventPayload::Broadcast(broadcast) = &event.payload {
            let mut stats = self.broadcasts.lock().await;
            stats.attempted += 1;
            if broadcast.delivered {
                stats.delivered += 1;
                stats.bytes += broadcast.bytes as u64;
            }
        }

        let mut events = self.events.lock().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        debug!(kind = ?event.kind, "recording session event");
        events.push_back(event);
        Ok(())
    }

    pub async fn snapshot_events(&self) -> Vec<SessionEvent> {
        self.events.lock().await.iter().cloned().collect()
    }

    pub async fn events_of_kind(&self, kind: EventKind) -> Vec<SessionEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn events_since(&self, since: DateTime<Utc>) -> Vec<SessionEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.timestamp >= since)
            .cloned()
            .collect()
    }

    pub async fn find(&self, id: Uuid) -> Option<SessionEvent> {
        self.events
            .lock()
            .await
            .iter()
            .find(|event| event.id == id)
            .cloned()
    }

    pub async fn broadcast_stats(&self) -> BroadcastStats {
        self.broadcasts.lock().await.clone()
    }

    /// Retained events as a JSON array.
    pub async fn export_json(&self) -> Result<String> {
        let events = self.snapshot_events().await;
        serde_json::to_string_pretty(&events)
            .map_err(|err| PixmatrixError::Ops(format!("failed to serialize events: {err}")))
    }
}
