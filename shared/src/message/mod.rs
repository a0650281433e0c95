//! Push channel message types
//!
//! Shared between the farm controller and dashboard clients, used for
//! network (TCP) and in-process communication.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// Protocol version
pub const PROTOCOL_VERSION: u16 = 1;

/// Push channel event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Client handshake
    Hello = 0,
    /// Full printer list + fleet stats
    FleetSnapshot = 1,
    /// Partial update for one printer
    PrinterDelta = 2,
    /// Queue revalidation hint
    QueueChanged = 3,
    /// Keepalive
    Heartbeat = 4,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Hello),
            1 => Ok(EventType::FleetSnapshot),
            2 => Ok(EventType::PrinterDelta),
            3 => Ok(EventType::QueueChanged),
            4 => Ok(EventType::Heartbeat),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Hello => write!(f, "hello"),
            EventType::FleetSnapshot => write!(f, "fleet_snapshot"),
            EventType::PrinterDelta => write!(f, "printer_delta"),
            EventType::QueueChanged => write!(f, "queue_changed"),
            EventType::Heartbeat => write!(f, "heartbeat"),
        }
    }
}

/// Push channel message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub payload: Vec<u8>,
}

impl FarmMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            payload,
        }
    }

    /// Build a handshake message
    pub fn hello(payload: &HelloPayload) -> Self {
        Self::new(
            EventType::Hello,
            serde_json::to_vec(payload).expect("Failed to serialize hello payload"),
        )
    }

    /// Build a full fleet snapshot message
    pub fn fleet_snapshot(payload: &FleetSnapshot) -> Self {
        Self::new(
            EventType::FleetSnapshot,
            serde_json::to_vec(payload).expect("Failed to serialize fleet snapshot"),
        )
    }

    /// Build a single-printer delta message
    pub fn printer_delta(payload: &crate::models::PrinterDelta) -> Self {
        Self::new(
            EventType::PrinterDelta,
            serde_json::to_vec(payload).expect("Failed to serialize printer delta"),
        )
    }

    /// Build a queue revalidation hint
    pub fn queue_changed(payload: &QueueChangedPayload) -> Self {
        Self::new(
            EventType::QueueChanged,
            serde_json::to_vec(payload).expect("Failed to serialize queue hint"),
        )
    }

    /// Build an empty keepalive message
    pub fn heartbeat() -> Self {
        Self::new(EventType::Heartbeat, Vec::new())
    }

    /// Parse the payload into a concrete type
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
