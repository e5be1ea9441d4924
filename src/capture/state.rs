use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calibration::{CalibrationConfig, FocalCalibrator};
use crate::models::CaptureEvent;
use crate::telemetry::SectorCoverage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum CapturePhase {
    #[default]
    Idle,
    Discovering,
    ZonesReady,
    Sweeping,
    AwaitingZone {
        zone: usize,
    },
    CapturingZone {
        zone: usize,
    },
    Complete,
}

impl CapturePhase {
    /// True for every phase of an active Sweep run.
    pub fn is_sweeping(&self) -> bool {
        matches!(
            self,
            CapturePhase::Sweeping
                | CapturePhase::AwaitingZone { .. }
                | CapturePhase::CapturingZone { .. }
        )
    }

    pub fn awaiting_zone(&self) -> Option<usize> {
        match self {
            CapturePhase::AwaitingZone { zone } => Some(*zone),
            _ => None,
        }
    }
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePhase::Idle => write!(f, "idle"),
            CapturePhase::Discovering => write!(f, "discovering"),
            CapturePhase::ZonesReady => write!(f, "zones ready"),
            CapturePhase::Sweeping => write!(f, "sweeping"),
            CapturePhase::AwaitingZone { zone } => write!(f, "awaiting zone {zone}"),
            CapturePhase::CapturingZone { zone } => write!(f, "capturing zone {zone}"),
            CapturePhase::Complete => write!(f, "complete"),
        }
    }
}

/// Progress of the active Sweep run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRun {
    pub started_at_ms: u64,
    /// Sensor time of the last focus sample, or of the sweep start.
    pub last_focus_ms: u64,
    pub stalled: bool,
    pub captures: u32,
}

impl SweepRun {
    pub fn new(started_at_ms: u64) -> Self {
        Self {
            started_at_ms,
            last_focus_ms: started_at_ms,
            stalled: false,
            captures: 0,
        }
    }
}

/// Everything tied to one calibration attempt. Owned by the state machine and
/// dropped as a whole on abort or restart.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub calibrator: FocalCalibrator,
    pub sweep: Option<SweepRun>,
    pub coverage: SectorCoverage,
}

impl CalibrationSession {
    pub fn new(calibration: CalibrationConfig, sector_width_deg: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            calibrator: FocalCalibrator::new(calibration),
            sweep: None,
            coverage: SectorCoverage::new(sector_width_deg),
        }
    }
}

/// Notifications produced by the state machine for every input it processes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    PhaseChanged {
        from: CapturePhase,
        to: CapturePhase,
    },
    Captured {
        event: CaptureEvent,
    },
    SweepComplete {
        captures: u32,
    },
    #[serde(rename_all = "camelCase")]
    SensorStalled {
        last_focus_ms: u64,
        stalled_for_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    SensorRecovered {
        after_ms: u64,
    },
    ConfidenceLow {
        confidence: f64,
    },
    ConfidenceRestored {
        confidence: f64,
    },
}

impl EngineEvent {
    pub fn capture(&self) -> Option<&CaptureEvent> {
        match self {
            EngineEvent::Captured { event } => Some(event),
            _ => None,
        }
    }
}
