use serde::{Deserialize, Serialize};

/// Below this many diopters the lens is treated as focused at infinity.
const INFINITY_DIOPTER: f64 = 0.01;

/// Raw lens focus reading. Diopter is `1 / distance` in meters and grows as the
/// lens focuses closer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSample {
    pub diopter: f64,
    pub timestamp_ms: u64,
}

impl FocusSample {
    pub fn new(diopter: f64, timestamp_ms: u64) -> Self {
        Self {
            diopter,
            timestamp_ms,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.diopter.is_finite() && self.diopter >= 0.0
    }

    /// Focus distance in meters rounded to millimeters, `0.0` for infinity focus.
    pub fn focus_distance_m(&self) -> f64 {
        if self.diopter > INFINITY_DIOPTER {
            (1000.0 / self.diopter).round() / 1000.0
        } else {
            0.0
        }
    }
}

/// Accelerometer-derived motion magnitude in m/s².
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JitterSample {
    pub magnitude: f64,
    pub timestamp_ms: u64,
}

impl JitterSample {
    pub fn new(magnitude: f64, timestamp_ms: u64) -> Self {
        Self {
            magnitude,
            timestamp_ms,
        }
    }

    /// Builds a sample from a gravity-compensated acceleration vector.
    pub fn from_linear_acceleration(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self::new((x * x + y * y + z * z).sqrt(), timestamp_ms)
    }
}
