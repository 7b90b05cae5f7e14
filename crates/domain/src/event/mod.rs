use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod publisher;
pub use publisher::EventPublisher;

use crate::radio::AdapterState;
use crate::slot::SlotId;
use crate::transport::ConnectionState;

/// Events emitted by the bridge core to its subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A slot changed connection state
    ConnectionStateChanged {
        slot_id: SlotId,
        state: ConnectionState,
        /// Set when the transition was caused by a failure
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Host radio power state changed
    AdapterStateChanged {
        state: AdapterState,
        timestamp: DateTime<Utc>,
    },

    /// Host reported a low-level link coming up or going down
    LinkStateChanged {
        connected: bool,
        timestamp: DateTime<Utc>,
    },

    /// Bytes received from a printer (status / ack)
    StatusReceived {
        slot_id: SlotId,
        bytes: Vec<u8>,
        timestamp: DateTime<Utc>,
    },

    /// A reader loop ended because of a port error
    ReaderStopped {
        slot_id: SlotId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A queued operation failed after the caller was acknowledged
    TaskFailed {
        slot_id: Option<SlotId>,
        operation: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Create a ConnectionStateChanged event
    pub fn connection_state_changed(
        slot_id: SlotId,
        state: ConnectionState,
        reason: Option<String>,
    ) -> Self {
        Self::ConnectionStateChanged {
            slot_id,
            state,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Create an AdapterStateChanged event
    pub fn adapter_state_changed(state: AdapterState) -> Self {
        Self::AdapterStateChanged {
            state,
            timestamp: Utc::now(),
        }
    }

    /// Create a LinkStateChanged event
    pub fn link_state_changed(connected: bool) -> Self {
        Self::LinkStateChanged {
            connected,
            timestamp: Utc::now(),
        }
    }

    /// Create a StatusReceived event
    pub fn status_received(slot_id: SlotId, bytes: Vec<u8>) -> Self {
        Self::StatusReceived {
            slot_id,
            bytes,
            timestamp: Utc::now(),
        }
    }

    /// Create a ReaderStopped event
    pub fn reader_stopped(slot_id: SlotId, reason: impl Into<String>) -> Self {
        Self::ReaderStopped {
            slot_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a TaskFailed event
    pub fn task_failed(
        slot_id: Option<SlotId>,
        operation: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::TaskFailed {
            slot_id,
            operation: operation.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Integer state code for subscribers of the state stream:
    /// 0 disconnected, 1 connected, adapter power codes otherwise.
    pub fn state_code(&self) -> Option<i32> {
        match self {
            Self::ConnectionStateChanged { state, .. } => Some(state.code()),
            Self::AdapterStateChanged { state, .. } => Some(state.code()),
            Self::LinkStateChanged { connected, .. } => Some(i32::from(*connected)),
            _ => None,
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ConnectionStateChanged { timestamp, .. } => *timestamp,
            Self::AdapterStateChanged { timestamp, .. } => *timestamp,
            Self::LinkStateChanged { timestamp, .. } => *timestamp,
            Self::StatusReceived { timestamp, .. } => *timestamp,
            Self::ReaderStopped { timestamp, .. } => *timestamp,
            Self::TaskFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::ConnectionStateChanged { .. } => "ConnectionStateChanged",
            Self::AdapterStateChanged { .. } => "AdapterStateChanged",
            Self::LinkStateChanged { .. } => "LinkStateChanged",
            Self::StatusReceived { .. } => "StatusReceived",
            Self::ReaderStopped { .. } => "ReaderStopped",
            Self::TaskFailed { .. } => "TaskFailed",
        }
    }
}
