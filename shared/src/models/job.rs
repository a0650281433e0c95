//! Print Job Model

use serde::{Deserialize, Serialize};

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Eligible for dispatch
    #[default]
    Active,
    /// Held back by the operator
    Paused,
    /// Every copy has been printed
    Completed,
}

/// Ejection settings carried by a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EjectionConfig {
    pub enabled: bool,
    /// Saved ejection preset to pull G-code from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<i64>,
    /// Inline end G-code (takes precedence over the preset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_gcode: Option<String>,
    /// Bed temperature the plate must cool to before ejection (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_temp: Option<f32>,
}

/// A job in the print queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: i64,
    /// Display name, falls back to the filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub filename: String,
    /// Copies requested
    pub quantity: u32,
    /// Copies already dispatched to printers
    #[serde(default)]
    pub sent: u32,
    /// Zero-based queue position, contiguous across the whole queue
    pub priority: u32,
    /// Printer groups allowed to pick this job up
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    /// Estimated filament per copy (grams)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filament_g: Option<f64>,
    #[serde(default)]
    pub ejection: EjectionConfig,
}

impl PrintJob {
    /// Copies still to print
    pub fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.sent)
    }

    /// Name shown on the dashboard card
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.filename)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(sent) = patch.sent {
            self.sent = sent;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(groups) = &patch.groups {
            self.groups = groups.clone();
        }
        if let Some(ejection) = &patch.ejection {
            self.ejection = ejection.clone();
        }
    }
}

/// Partial job update. `None` means "field not included".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ejection: Option<EjectionConfig>,
}

impl JobPatch {
    /// Patch that only changes the requested quantity.
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    /// Patch that only replaces the ejection settings.
    pub fn ejection(config: EjectionConfig) -> Self {
        Self {
            ejection: Some(config),
            ..Default::default()
        }
    }
}
