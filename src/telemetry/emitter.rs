use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureStateMachine;
use crate::models::CaptureEvent;

use super::{FrameKind, TelemetryFrame};

/// Telemetry cadence and coverage resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Upper bound on periodic frames per second
    pub max_rate_hz: f64,

    /// Width of one azimuth coverage sector
    pub sector_width_deg: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_rate_hz: 20.0,
            sector_width_deg: 10.0,
        }
    }
}

/// Packages engine state into [`TelemetryFrame`]s.
///
/// Holds nothing but the shared sequence counter and the time of the last
/// periodic frame; it only ever reads the machine.
#[derive(Debug, Clone)]
pub struct TelemetryEmitter {
    min_interval_ms: u64,
    last_periodic_ms: Option<u64>,
    next_sequence: u64,
}

impl TelemetryEmitter {
    pub fn new(config: &TelemetryConfig) -> Self {
        let min_interval_ms = if config.max_rate_hz > 0.0 {
            (1000.0 / config.max_rate_hz).ceil() as u64
        } else {
            0
        };
        Self {
            min_interval_ms,
            last_periodic_ms: None,
            next_sequence: 1,
        }
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }

    /// Periodic frame, or `None` when the previous one is too recent.
    pub fn snapshot(&mut self, engine: &CaptureStateMachine, now_ms: u64) -> Option<TelemetryFrame> {
        if let Some(last) = self.last_periodic_ms {
            if now_ms < last.saturating_add(self.min_interval_ms) {
                return None;
            }
        }
        self.last_periodic_ms = Some(now_ms);
        Some(self.frame(engine, now_ms, FrameKind::Periodic, None))
    }

    /// Out-of-band frame for a capture; ignores the cadence and does not delay
    /// the next periodic frame.
    pub fn capture_frame(&mut self, engine: &CaptureStateMachine, event: &CaptureEvent) -> TelemetryFrame {
        let now_ms = engine.latest_ms().max(event.pose.timestamp_ms);
        self.frame(engine, now_ms, FrameKind::Capture, Some(event.clone()))
    }

    fn frame(
        &mut self,
        engine: &CaptureStateMachine,
        now_ms: u64,
        kind: FrameKind,
        capture: Option<CaptureEvent>,
    ) -> TelemetryFrame {
        let sequence_id = self.next_sequence;
        self.next_sequence += 1;

        let focus = engine.latest_focus();
        TelemetryFrame {
            sequence_id,
            kind,
            emitted_at: Utc::now(),
            timestamp_ms: now_ms,
            phase: engine.phase(),
            session_id: engine.session().map(|session| session.id.clone()),
            pose: engine.latest_pose(),
            focus,
            focus_distance_m: focus.map(|sample| sample.focus_distance_m()),
            zones: engine
                .zones()
                .map(|zones| zones.zones().to_vec())
                .unwrap_or_default(),
            stability: engine.stability(),
            coverage: engine.coverage().unwrap_or_default(),
            stalled: engine.is_stalled(),
            capture,
        }
    }
}

impl Default for TelemetryEmitter {
    fn default() -> Self {
        Self::new(&TelemetryConfig::default())
    }
}

/// Frames a consumer missed between two received sequence ids.
pub fn dropped_since(previous: u64, current: u64) -> u64 {
    current.saturating_sub(previous).saturating_sub(1)
}
