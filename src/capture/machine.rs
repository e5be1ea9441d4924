use chrono::Utc;

use crate::calibration::{FocalCalibrator, ZoneMap};
use crate::error::{EngineError, Result};
use crate::models::{CaptureEvent, FocusSample, JitterSample, PoseSample, RotationVector, SensorSample};
use crate::orientation::{angular_distance, OrientationTracker};
use crate::settings::EngineConfig;
use crate::stability::{StabilityGate, StabilitySnapshot};
use crate::telemetry::CoverageSnapshot;

use super::commands::{CommandKind, OperatorCommand};
use super::state::{CalibrationSession, CapturePhase, EngineEvent, SweepRun};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Degrees of tilt per altitude unit (100 units span 180°).
const DEGREES_PER_ALTITUDE_UNIT: f64 = 1.8;

/// The auto-capture decision core.
///
/// Single-threaded and synchronous: every sensor sample and operator command is
/// applied through `&mut self` in arrival order, and each call returns the
/// [`EngineEvent`]s it produced. Runtime concerns (queues, clocks, sinks) live in
/// [`crate::sensing`].
#[derive(Debug)]
pub struct CaptureStateMachine {
    config: EngineConfig,
    phase: CapturePhase,
    session: Option<CalibrationSession>,
    tracker: OrientationTracker,
    gate: StabilityGate,
    latest_pose: Option<PoseSample>,
    latest_focus: Option<FocusSample>,
    /// Newest sensor timestamp seen on any stream.
    latest_ms: u64,
    next_capture_id: u64,
}

impl CaptureStateMachine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tracker: OrientationTracker::new(config.tracker.clone()),
            gate: StabilityGate::new(config.stability.clone()),
            config,
            phase: CapturePhase::Idle,
            session: None,
            latest_pose: None,
            latest_focus: None,
            latest_ms: 0,
            next_capture_id: 1,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        self.session.as_ref()
    }

    pub fn zones(&self) -> Option<&ZoneMap> {
        self.session.as_ref()?.calibrator.zones()
    }

    pub fn latest_pose(&self) -> Option<PoseSample> {
        self.latest_pose
    }

    pub fn latest_focus(&self) -> Option<FocusSample> {
        self.latest_focus
    }

    pub fn latest_ms(&self) -> u64 {
        self.latest_ms
    }

    pub fn stability(&self) -> StabilitySnapshot {
        self.gate.snapshot()
    }

    pub fn coverage(&self) -> Option<CoverageSnapshot> {
        self.session.as_ref().map(|session| session.coverage.snapshot())
    }

    pub fn is_stalled(&self) -> bool {
        self.sweep().is_some_and(|sweep| sweep.stalled)
    }

    /// Routes one hardware sample to its handler.
    pub fn handle(&mut self, sample: SensorSample) -> Vec<EngineEvent> {
        match sample {
            SensorSample::Rotation(raw) => self.on_rotation(&raw),
            SensorSample::Focus(focus) => self.on_focus(focus),
            SensorSample::Jitter(jitter) => self.on_jitter(jitter),
        }
    }

    pub fn on_rotation(&mut self, raw: &RotationVector) -> Vec<EngineEvent> {
        let pose = self.tracker.update(raw);
        self.observe_time(pose.timestamp_ms);
        let mut events = Vec::new();

        if let Some(previous) = self.latest_pose {
            let dt_ms = pose.timestamp_ms.saturating_sub(previous.timestamp_ms);
            if dt_ms > 0 {
                let heading = angular_distance(previous.azimuth_deg, pose.azimuth_deg);
                let tilt = (pose.altitude - previous.altitude).abs() * DEGREES_PER_ALTITUDE_UNIT;
                let rate_dps = heading.max(tilt) * 1000.0 / dt_ms as f64;
                self.gate.observe_rotation_rate(rate_dps, pose.timestamp_ms);
            }
        }

        if self.phase.awaiting_zone().is_some() {
            let floor = self.config.capture.confidence_floor;
            if pose.confidence < floor && !self.gate.is_suspended() {
                log_warn!(
                    "pose confidence {:.2} below floor {:.2}; hold suspended",
                    pose.confidence,
                    floor
                );
                self.gate.suspend(pose.timestamp_ms);
                events.push(EngineEvent::ConfidenceLow {
                    confidence: pose.confidence,
                });
            } else if pose.confidence >= floor && self.gate.is_suspended() {
                log_info!("pose confidence restored to {:.2}; hold resumed", pose.confidence);
                self.gate.resume(pose.timestamp_ms);
                events.push(EngineEvent::ConfidenceRestored {
                    confidence: pose.confidence,
                });
            }
        }

        self.latest_pose = Some(pose);
        events.extend(self.check_stall(pose.timestamp_ms));
        events
    }

    pub fn on_focus(&mut self, sample: FocusSample) -> Vec<EngineEvent> {
        if !sample.is_valid() {
            log_debug!(
                "ignoring invalid focus reading {} at {} ms",
                sample.diopter,
                sample.timestamp_ms
            );
            return Vec::new();
        }
        self.observe_time(sample.timestamp_ms);
        self.latest_focus = Some(sample);
        let mut events = Vec::new();

        match self.phase {
            CapturePhase::Discovering => {
                if let Some(session) = self.session.as_mut() {
                    session.calibrator.record(&sample);
                }
            }
            phase if phase.is_sweeping() => {
                if let Some(sweep) = self.sweep_mut() {
                    let gap = sample.timestamp_ms.saturating_sub(sweep.last_focus_ms);
                    sweep.last_focus_ms = sweep.last_focus_ms.max(sample.timestamp_ms);
                    if sweep.stalled {
                        sweep.stalled = false;
                        log_info!("focus stream recovered after {gap} ms; hold re-armed");
                        events.push(EngineEvent::SensorRecovered { after_ms: gap });
                        self.rearm_hold(sample.timestamp_ms);
                    }
                }
                self.resolve_zone(&sample, &mut events);
            }
            _ => {}
        }
        events
    }

    pub fn on_jitter(&mut self, sample: JitterSample) -> Vec<EngineEvent> {
        self.observe_time(sample.timestamp_ms);
        let state = self.gate.observe(sample.magnitude, sample.timestamp_ms);
        let mut events = self.check_stall(sample.timestamp_ms);

        if let Some(zone) = self.phase.awaiting_zone() {
            if state.is_steady {
                self.try_capture(zone, &mut events);
            }
        }
        events
    }

    /// Reports a stall once when sweeping without focus samples for longer than
    /// the stall window. The phase is left untouched.
    pub fn check_stall(&mut self, now_ms: u64) -> Vec<EngineEvent> {
        if !self.phase.is_sweeping() {
            return Vec::new();
        }
        let window = self.config.capture.stall_window_ms;
        let Some(sweep) = self.sweep_mut() else {
            return Vec::new();
        };
        if sweep.stalled {
            return Vec::new();
        }

        let stalled_for_ms = now_ms.saturating_sub(sweep.last_focus_ms);
        if stalled_for_ms <= window {
            return Vec::new();
        }
        sweep.stalled = true;
        let last_focus_ms = sweep.last_focus_ms;
        log_warn!("no focus sample for {stalled_for_ms} ms; captures blocked until it resumes");
        vec![EngineEvent::SensorStalled {
            last_focus_ms,
            stalled_for_ms,
        }]
    }

    /// Applies an operator command. Rejected commands leave every piece of state
    /// unchanged.
    pub fn apply(&mut self, command: OperatorCommand) -> Result<Vec<EngineEvent>> {
        let kind = command.kind();
        let mut events = Vec::new();

        match (command, self.phase) {
            (OperatorCommand::StartDiscovery, CapturePhase::Idle | CapturePhase::ZonesReady) => {
                let calibration = self.config.calibration.clone();
                let sector_width = self.config.telemetry.sector_width_deg;
                let session = self
                    .session
                    .get_or_insert_with(|| CalibrationSession::new(calibration, sector_width));
                session.calibrator.start_discovery();
                session.sweep = None;
                log_info!("discovery started for session {}", session.id);
                self.transition(CapturePhase::Discovering, &mut events);
            }
            (OperatorCommand::FinishDiscovery, CapturePhase::Discovering) => {
                self.calibrator_mut(kind)?.finish_discovery()?;
                self.transition(CapturePhase::ZonesReady, &mut events);
            }
            (OperatorCommand::FinishSingleZone, CapturePhase::Discovering) => {
                self.calibrator_mut(kind)?.finish_single_zone()?;
                self.transition(CapturePhase::ZonesReady, &mut events);
            }
            (OperatorCommand::StartSweep, phase @ CapturePhase::ZonesReady) => {
                let started_at_ms = self.latest_ms;
                let session = self
                    .session
                    .as_mut()
                    .ok_or(EngineError::invalid_transition(kind, phase))?;
                session.sweep = Some(SweepRun::new(started_at_ms));
                self.transition(CapturePhase::Sweeping, &mut events);
            }
            (OperatorCommand::RecaptureZone { index }, phase)
                if phase.is_sweeping() || phase == CapturePhase::Complete =>
            {
                self.recapture(index, &mut events)?;
            }
            (OperatorCommand::Abort, _) => {
                if let Some(session) = self.session.take() {
                    log_info!("calibration session {} aborted", session.id);
                }
                self.gate.reset();
                self.transition(CapturePhase::Idle, &mut events);
            }
            (OperatorCommand::Restart, _) => {
                self.session = None;
                self.tracker.reset();
                self.gate.reset();
                self.latest_pose = None;
                self.latest_focus = None;
                log_info!("engine restarted");
                self.transition(CapturePhase::Idle, &mut events);
            }
            (OperatorCommand::CaptureNow, _) => {
                let event = self.ad_hoc_capture()?;
                events.push(EngineEvent::Captured { event });
            }
            (_, phase) => {
                log_warn!("rejected {kind} while {phase}");
                return Err(EngineError::invalid_transition(kind, phase));
            }
        }
        Ok(events)
    }

    fn resolve_zone(&mut self, sample: &FocusSample, events: &mut Vec<EngineEvent>) {
        let Some(zones) = self.zones() else {
            return;
        };
        let target = zones
            .index_for(sample.diopter)
            .filter(|index| !zones.is_captured(*index));

        match (self.phase, target) {
            (CapturePhase::Sweeping, Some(zone)) => {
                self.enter_awaiting(zone, sample.timestamp_ms, events);
            }
            (CapturePhase::AwaitingZone { zone: current }, Some(zone)) if zone != current => {
                log_debug!("focus drifted from zone {current} to zone {zone}; hold re-armed");
                self.enter_awaiting(zone, sample.timestamp_ms, events);
            }
            (CapturePhase::AwaitingZone { zone: current }, None) => {
                log_debug!("focus left zone {current}");
                self.transition(CapturePhase::Sweeping, events);
            }
            _ => {}
        }
    }

    fn enter_awaiting(&mut self, zone: usize, timestamp_ms: u64, events: &mut Vec<EngineEvent>) {
        self.rearm_hold(timestamp_ms);
        self.transition(CapturePhase::AwaitingZone { zone }, events);
    }

    /// Restarts the hold at `timestamp_ms`, keeping it suspended while the
    /// latest pose is below the confidence floor.
    fn rearm_hold(&mut self, timestamp_ms: u64) {
        self.gate.restart(timestamp_ms);
        let low_confidence = self
            .latest_pose
            .is_some_and(|pose| pose.confidence < self.config.capture.confidence_floor);
        if low_confidence {
            self.gate.suspend(timestamp_ms);
        }
    }

    fn try_capture(&mut self, zone: usize, events: &mut Vec<EngineEvent>) {
        if self.is_stalled() || self.gate.is_suspended() {
            return;
        }
        let (Some(pose), Some(focus)) = (self.latest_pose, self.latest_focus) else {
            return;
        };
        let lens_index = self.config.capture.lens_index;
        let sequence_id = self.next_capture_id;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(zones) = session.calibrator.zones_mut() else {
            return;
        };
        if zones.is_captured(zone) || zones.index_for(focus.diopter) != Some(zone) {
            return;
        }
        zones.mark_captured(zone);
        let complete = zones.all_captured();
        session.coverage.record(pose.azimuth_deg);
        let captures = session.sweep.as_mut().map_or(0, |sweep| {
            sweep.captures += 1;
            sweep.captures
        });
        self.next_capture_id += 1;

        let event = CaptureEvent {
            sequence_id,
            zone_index: Some(zone),
            pose,
            focus,
            lens_index,
            captured_at: Utc::now(),
        };
        log_info!(
            "capture #{sequence_id}: zone {zone} at {:.1}° / {:.3} D",
            pose.azimuth_deg,
            focus.diopter
        );

        self.transition(CapturePhase::CapturingZone { zone }, events);
        events.push(EngineEvent::Captured { event });
        if complete {
            self.transition(CapturePhase::Complete, events);
            events.push(EngineEvent::SweepComplete { captures });
        } else {
            self.transition(CapturePhase::Sweeping, events);
        }
    }

    fn recapture(&mut self, index: usize, events: &mut Vec<EngineEvent>) -> Result<()> {
        let latest_ms = self.latest_ms;
        let was_complete = self.phase == CapturePhase::Complete;
        let session = self
            .session
            .as_mut()
            .ok_or(EngineError::SignalUnavailable("calibration session"))?;
        let zones = session
            .calibrator
            .zones_mut()
            .ok_or(EngineError::SignalUnavailable("focal zones"))?;
        if !zones.clear_captured(index) {
            return Err(EngineError::InvalidZone {
                index,
                zone_count: zones.len(),
            });
        }
        log_info!("zone {index} re-opened for capture");

        if was_complete {
            if let Some(sweep) = session.sweep.as_mut() {
                sweep.last_focus_ms = latest_ms;
                sweep.stalled = false;
            }
            self.transition(CapturePhase::Sweeping, events);
        }
        Ok(())
    }

    fn ad_hoc_capture(&mut self) -> Result<CaptureEvent> {
        if let Some(sweep) = self.sweep().filter(|sweep| sweep.stalled) {
            return Err(EngineError::SensorStalled {
                stalled_for_ms: self.latest_ms.saturating_sub(sweep.last_focus_ms),
            });
        }
        let pose = self.latest_pose.ok_or(EngineError::SignalUnavailable("pose"))?;
        let focus = self.latest_focus.ok_or(EngineError::SignalUnavailable("focus"))?;

        if let Some(session) = self.session.as_mut() {
            session.coverage.record(pose.azimuth_deg);
        }
        let sequence_id = self.next_capture_id;
        self.next_capture_id += 1;
        log_info!("capture #{sequence_id}: operator-initiated");

        Ok(CaptureEvent {
            sequence_id,
            zone_index: None,
            pose,
            focus,
            lens_index: self.config.capture.lens_index,
            captured_at: Utc::now(),
        })
    }

    fn transition(&mut self, to: CapturePhase, events: &mut Vec<EngineEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        log_info!("phase {from} -> {to}");
        self.phase = to;
        events.push(EngineEvent::PhaseChanged { from, to });
    }

    fn observe_time(&mut self, timestamp_ms: u64) {
        self.latest_ms = self.latest_ms.max(timestamp_ms);
    }

    fn sweep(&self) -> Option<&SweepRun> {
        self.session.as_ref()?.sweep.as_ref()
    }

    fn sweep_mut(&mut self) -> Option<&mut SweepRun> {
        self.session.as_mut()?.sweep.as_mut()
    }

    fn calibrator_mut(&mut self, kind: CommandKind) -> Result<&mut FocalCalibrator> {
        let phase = self.phase;
        self.session
            .as_mut()
            .map(|session| &mut session.calibrator)
            .ok_or(EngineError::invalid_transition(kind, phase))
    }
}

impl Default for CaptureStateMachine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
