//! Shared types for the Spool print farm
//!
//! Common types used by the controller and dashboard clients: entity
//! models, push message envelope, response structures and utilities.

pub mod client;
pub mod message;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Push channel re-exports (for convenient access)
pub use message::{EventType, FarmMessage, PROTOCOL_VERSION};

// Model re-exports (for convenient access)
pub use models::{
    EjectionConfig, EjectionPreset, FleetStats, JobPatch, JobStatus, PrintJob, Printer,
    PrinterDelta, PrinterKind, PrinterState,
};

pub use client::PrinterCommand;
pub use response::ApiResponse;
