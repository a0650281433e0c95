//! Fleet-wide aggregate counters

use serde::{Deserialize, Serialize};

/// Lifetime totals across the whole farm
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FleetStats {
    /// Filament consumed since the farm was set up (kg)
    #[serde(default)]
    pub total_filament_kg: f64,
    /// Copies dispatched since the farm was set up
    #[serde(default)]
    pub total_sent: u64,
}
