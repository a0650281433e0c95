//! Data models
//!
//! Shared between the farm controller and dashboard clients (via API).
//! All IDs are `i64`; printers are keyed by their unique name.

pub mod fleet;
pub mod job;
pub mod preset;
pub mod printer;

// Re-exports
pub use fleet::*;
pub use job::*;
pub use preset::*;
pub use printer::*;
