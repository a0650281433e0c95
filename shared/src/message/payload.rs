use crate::models::{FleetStats, Printer};
use serde::{Deserialize, Serialize};

// ==================== Payloads ====================

/// Handshake payload (client -> controller)
///
/// Carries the client's protocol version so the controller can reject
/// incompatible dashboards early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Protocol version
    pub version: u16,
    /// Client name/identifier
    pub client_name: Option<String>,
    /// Client build version
    pub client_version: Option<String>,
}

/// Full fleet snapshot (controller -> clients)
///
/// Broadcast on connect and whenever the controller decides incremental
/// deltas are not enough (e.g. after its own restart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub printers: Vec<Printer>,
    #[serde(default)]
    pub stats: FleetStats,
}

/// Queue revalidation hint (controller -> clients)
///
/// The queue itself is never pushed; clients re-fetch it over HTTP when
/// this arrives. `version` increases with every queue change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueChangedPayload {
    pub version: u64,
}

// ==================== Convenience Constructors ====================

impl HelloPayload {
    pub fn new(version: u16, client_name: impl Into<String>) -> Self {
        Self {
            version,
            client_name: Some(client_name.into()),
            client_version: None,
        }
    }
}

impl FleetSnapshot {
    pub fn new(printers: Vec<Printer>, stats: FleetStats) -> Self {
        Self { printers, stats }
    }
}
