use serde::{Deserialize, Serialize};

use super::{FocusSample, JitterSample, RotationVector};

/// One timestamped reading from any of the hardware streams, in arrival order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum SensorSample {
    Rotation(RotationVector),
    Focus(FocusSample),
    Jitter(JitterSample),
}

impl SensorSample {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            SensorSample::Rotation(raw) => raw.timestamp_ms,
            SensorSample::Focus(sample) => sample.timestamp_ms,
            SensorSample::Jitter(sample) => sample.timestamp_ms,
        }
    }
}
