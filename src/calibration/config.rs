use serde::{Deserialize, Serialize};

/// Configuration for focal zone calibration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of equal-diopter zones the discovered range is split into
    pub zone_count: usize,

    /// Spans narrower than this (in diopters) do not need multi-focus capture
    pub min_diopter_span: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            zone_count: 4,
            min_diopter_span: 0.5,
        }
    }
}
