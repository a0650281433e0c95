//! Ejection Preset Model

use serde::{Deserialize, Serialize};

/// End G-code run when a job that references no preset ejects
pub const DEFAULT_END_GCODE: &str = "G28 X Y\nM84";

/// Saved ejection G-code preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EjectionPreset {
    pub id: i64,
    pub name: String,
    pub gcode: String,
}

impl EjectionPreset {
    pub fn new(id: i64, name: impl Into<String>, gcode: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gcode: gcode.into(),
        }
    }
}
