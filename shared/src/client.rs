//! Client-related types shared between controller and dashboard
//!
//! Request bodies and command verbs used by the mutation API.

use serde::{Deserialize, Serialize};

// Re-export ApiResponse from response module
pub use crate::response::ApiResponse;

// =============================================================================
// Queue mutation DTOs
// =============================================================================

/// Body for `POST /api/v1/orders/{id}/move`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Target zero-based queue index
    pub new_index: usize,
}

/// Body for `PATCH /api/v1/orders/{id}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

// =============================================================================
// Printer mutation DTOs
// =============================================================================

/// Body for `PATCH /api/v1/printers/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupUpdate {
    pub group: String,
}

/// Printer control verb issued from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterCommand {
    /// Abort the running print
    Stop,
    Pause,
    Resume,
    /// Plate cleared, printer may take the next job
    MarkReady,
    ClearError,
}

impl PrinterCommand {
    /// URL path segment of the command endpoint.
    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::MarkReady => "ready",
            Self::ClearError => "clear-error",
        }
    }
}

impl std::fmt::Display for PrinterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_path())
    }
}
