//! Printer Model
//!
//! Printer state is server-driven; the client only advances it locally
//! through the ejection cooldown gate (FINISHED → COOLING → EJECTING).

use serde::{Deserialize, Serialize};

/// Printer firmware family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterKind {
    Prusa,
    Bambu,
}

/// Printer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrinterState {
    #[default]
    Offline,
    Idle,
    Printing,
    Paused,
    Finished,
    Cooling,
    Ejecting,
    Error,
}

impl PrinterState {
    /// Operator-facing label. IDLE reads as "Ready" on the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Offline => "Offline",
            Self::Idle => "Ready",
            Self::Printing => "Printing",
            Self::Paused => "Paused",
            Self::Finished => "Finished",
            Self::Cooling => "Cooling",
            Self::Ejecting => "Ejecting",
            Self::Error => "Error",
        }
    }
}

/// A farm printer with live telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Printer {
    /// Unique printer name, used as the cache key
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: PrinterKind,
    /// Dispatch group this printer serves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub state: PrinterState,
    /// Print progress 0..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    /// Queue job currently printing on this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nozzle_temp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_temp: Option<f32>,
    /// Bed temperature the cooldown gate is waiting for (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_target: Option<f32>,
    /// When the current print finished (millis since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Printer {
    /// Apply a partial update in place. `None` fields are left untouched.
    pub fn apply(&mut self, delta: &PrinterDelta) {
        if let Some(state) = delta.state {
            self.state = state;
        }
        if let Some(group) = &delta.group {
            self.group = Some(group.clone());
        }
        if let Some(progress) = delta.progress {
            self.progress = Some(progress);
        }
        if let Some(file) = &delta.current_file {
            self.current_file = Some(file.clone());
        }
        if let Some(job_id) = delta.current_job_id {
            self.current_job_id = Some(job_id);
        }
        if let Some(seconds) = delta.seconds_remaining {
            self.seconds_remaining = Some(seconds);
        }
        if let Some(nozzle) = delta.nozzle_temp {
            self.nozzle_temp = Some(nozzle);
        }
        if let Some(bed) = delta.bed_temp {
            self.bed_temp = Some(bed);
        }
        if let Some(target) = delta.cooldown_target {
            self.cooldown_target = Some(target);
        }
        if let Some(finished) = delta.finished_at {
            self.finished_at = Some(finished);
        }
        if let Some(message) = &delta.error_message {
            self.error_message = Some(message.clone());
        }
    }

    /// Short stage label for the dashboard card.
    pub fn stage(&self) -> &'static str {
        self.state.label()
    }

    /// Stage with live detail, e.g. `Cooling (60°C → 40°C)`.
    pub fn stage_detail(&self) -> String {
        match self.state {
            PrinterState::Printing => match (self.progress, self.current_file.as_deref()) {
                (Some(progress), Some(file)) => format!("Printing {} ({:.0}%)", file, progress),
                (Some(progress), None) => format!("Printing ({:.0}%)", progress),
                _ => "Printing".to_string(),
            },
            PrinterState::Cooling => match (self.bed_temp, self.cooldown_target) {
                (Some(bed), Some(target)) => format!("Cooling ({:.0}°C → {:.0}°C)", bed, target),
                _ => "Cooling".to_string(),
            },
            PrinterState::Error => self
                .error_message
                .clone()
                .unwrap_or_else(|| "Error".to_string()),
            state => state.label().to_string(),
        }
    }

    /// Whole minutes since the last print finished, if known.
    pub fn minutes_since_finished(&self, now_millis: i64) -> Option<i64> {
        let finished_at = self.finished_at?;
        Some(((now_millis - finished_at) / 60_000).max(0))
    }
}

/// Partial printer update pushed by the controller.
///
/// `None` means "field not included", so a delta can never clear a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterDelta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PrinterState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nozzle_temp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_temp: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_target: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PrinterDelta {
    /// Whether the delta carries operator-editable config fields.
    pub fn touches_config(&self) -> bool {
        self.group.is_some()
    }

    /// Copy of the delta with config fields stripped.
    pub fn without_config(mut self) -> Self {
        self.group = None;
        self
    }
}
