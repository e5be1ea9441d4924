use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calibration::FocalZone;
use crate::capture::CapturePhase;
use crate::models::{CaptureEvent, FocusSample, PoseSample};
use crate::stability::StabilitySnapshot;

use super::CoverageSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FrameKind {
    /// Regular rate-limited tick.
    Periodic,
    /// Sent immediately after a shutter trigger, outside the regular cadence.
    Capture,
}

/// Point-in-time view of the engine for the live preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFrame {
    pub sequence_id: u64,
    pub kind: FrameKind,
    pub emitted_at: DateTime<Utc>,
    /// Sensor clock of the decision tick.
    pub timestamp_ms: u64,
    pub phase: CapturePhase,
    pub session_id: Option<String>,
    pub pose: Option<PoseSample>,
    pub focus: Option<FocusSample>,
    pub focus_distance_m: Option<f64>,
    /// Empty until zones are calibrated.
    pub zones: Vec<FocalZone>,
    pub stability: StabilitySnapshot,
    pub coverage: CoverageSnapshot,
    pub stalled: bool,
    pub capture: Option<CaptureEvent>,
}

impl TelemetryFrame {
    pub fn captured_zones(&self) -> usize {
        self.zones.iter().filter(|zone| zone.captured).count()
    }
}
