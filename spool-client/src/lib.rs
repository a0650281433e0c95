//! Spool Client - sync engine for farm dashboards
//!
//! Keeps a local cache of the farm controller's state (job queue, printers,
//! fleet stats, ejection presets) and reconciles it with optimistic
//! mutations, push events and HTTP refreshes, so dashboard renders never
//! wait on the network.

pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod store;
pub mod sync;

pub use config::{ClientConfig, PollConfig, StalenessConfig};
pub use error::{ClientError, ClientResult};
pub use http::{FarmApi, HttpClient};
pub use store::{Collection, FleetStore};
pub use sync::{MutationCoordinator, PushReconciler, SyncEngine};

// Re-export shared types for convenience
pub use shared::client::PrinterCommand;
pub use shared::models::{
    EjectionConfig, EjectionPreset, FleetStats, JobPatch, JobStatus, PrintJob, Printer,
    PrinterDelta, PrinterKind, PrinterState,
};

// Push channel types and session
pub use message::{PushConfig, PushError, PushEvent, PushSession};
