// spool-client/src/message/mod.rs
// Push channel module - session config, errors and decoded events

pub mod client;
pub mod transport;

pub use client::PushSession;
pub use shared::message::{EventType, FarmMessage, FleetSnapshot, HelloPayload, QueueChangedPayload};
pub use transport::{MemoryTransport, TcpTransport, Transport};

use shared::models::PrinterDelta;
use std::time::Duration;
use thiserror::Error;

/// Push channel error type
#[derive(Debug, Error)]
pub enum PushError {
    /// Could not reach or keep the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO failure on an established connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame or payload the client cannot make sense of
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Payload (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Decoded push event, as the reconciler consumes it
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// Full printer list plus fleet stats
    Snapshot(FleetSnapshot),
    /// Partial update for one printer
    Delta(PrinterDelta),
    /// The queue changed server-side; re-fetch it over HTTP
    QueueChanged(QueueChangedPayload),
    /// Connection lost; incremental updates can no longer be trusted
    ChannelDown,
    /// Connection (re)established
    ChannelUp,
}

/// Decode a wire message into a reconciler event.
///
/// Heartbeats and hello replies are session-internal and yield `None`.
pub fn decode_event(msg: &FarmMessage) -> Result<Option<PushEvent>, PushError> {
    let event = match msg.event_type {
        EventType::FleetSnapshot => Some(PushEvent::Snapshot(msg.parse_payload()?)),
        EventType::PrinterDelta => Some(PushEvent::Delta(msg.parse_payload()?)),
        EventType::QueueChanged => Some(PushEvent::QueueChanged(msg.parse_payload()?)),
        EventType::Hello | EventType::Heartbeat => None,
    };
    Ok(event)
}

/// Push session configuration
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Whether to redial after a lost connection
    pub auto_reconnect: bool,
    /// First reconnect delay
    pub reconnect_delay: Duration,
    /// Exponential backoff cap
    pub max_reconnect_delay: Duration,
    /// Maximum reconnect attempts (0 means retry forever)
    pub max_reconnect_attempts: u32,
    /// Keepalive interval (0 disables heartbeats)
    pub heartbeat_interval: Duration,
}

impl Default for PushConfig {
    /// LAN-tuned configuration: fast loss detection, fast recovery.
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
            max_reconnect_attempts: 20,
            heartbeat_interval: Duration::from_secs(5),
        }
    }
}

impl PushConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// LAN configuration (default)
    pub fn lan() -> Self {
        Self::default()
    }

    /// WAN/internet configuration: tolerates latency, fewer heartbeats,
    /// longer backoff cap.
    pub fn wan() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            max_reconnect_attempts: 20,
            heartbeat_interval: Duration::from_secs(30),
        }
    }

    /// Set auto-reconnect
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the first reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the heartbeat interval (0 disables)
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the maximum reconnect attempts (0 means retry forever)
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}
