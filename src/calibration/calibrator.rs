use serde::Serialize;

use crate::error::CalibrationError;
use crate::models::FocusSample;

use super::config::CalibrationConfig;
use super::zones::{FocalZone, ZoneMap};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Focus samples recorded while the operator racks focus across the subject.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRun {
    diopters: Vec<f64>,
    min: Option<f64>,
    max: Option<f64>,
    started_at_ms: Option<u64>,
}

impl DiscoveryRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one reading; invalid diopters are dropped. Returns whether the
    /// sample was kept.
    pub fn record(&mut self, sample: &FocusSample) -> bool {
        if !sample.is_valid() {
            return false;
        }
        let diopter = sample.diopter;
        self.diopters.push(diopter);
        self.min = Some(self.min.map_or(diopter, |min| min.min(diopter)));
        self.max = Some(self.max.map_or(diopter, |max| max.max(diopter)));
        self.started_at_ms.get_or_insert(sample.timestamp_ms);
        true
    }

    pub fn sample_count(&self) -> usize {
        self.diopters.len()
    }

    /// Observed `(min, max)` diopters.
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.min?, self.max?))
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }
}

/// Phases of the calibration sub-state-machine.
#[derive(Debug, Clone)]
pub enum CalibratorPhase {
    Idle,
    Discovering(DiscoveryRun),
    Calibrated(ZoneMap),
}

/// Owns one Discovery run at a time and the zone map it produces.
#[derive(Debug, Clone)]
pub struct FocalCalibrator {
    config: CalibrationConfig,
    phase: CalibratorPhase,
}

impl FocalCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: CalibratorPhase::Idle,
        }
    }

    pub fn phase(&self) -> &CalibratorPhase {
        &self.phase
    }

    /// Starts a fresh Discovery run, discarding any previous zones.
    pub fn start_discovery(&mut self) {
        if matches!(self.phase, CalibratorPhase::Calibrated(_)) {
            log_info!("discarding calibrated zones for a new discovery run");
        }
        self.phase = CalibratorPhase::Discovering(DiscoveryRun::new());
    }

    /// Feeds a live focus sample; only recorded while discovering.
    pub fn record(&mut self, sample: &FocusSample) {
        if let CalibratorPhase::Discovering(run) = &mut self.phase {
            if !run.record(sample) {
                log_debug!(
                    "ignoring invalid diopter {} at {} ms",
                    sample.diopter,
                    sample.timestamp_ms
                );
            }
        }
    }

    pub fn discovery(&self) -> Option<&DiscoveryRun> {
        match &self.phase {
            CalibratorPhase::Discovering(run) => Some(run),
            _ => None,
        }
    }

    pub fn zones(&self) -> Option<&ZoneMap> {
        match &self.phase {
            CalibratorPhase::Calibrated(map) => Some(map),
            _ => None,
        }
    }

    pub fn zones_mut(&mut self) -> Option<&mut ZoneMap> {
        match &mut self.phase {
            CalibratorPhase::Calibrated(map) => Some(map),
            _ => None,
        }
    }

    /// Ends Discovery and partitions the observed range into the configured
    /// number of zones. On error the run stays open so the operator can keep
    /// sweeping or fall back to [`finish_single_zone`](Self::finish_single_zone).
    pub fn finish_discovery(&mut self) -> Result<ZoneMap, CalibrationError> {
        let (min, max) = self.observed_range()?;
        let span = max - min;
        // several zones need a non-empty range to partition
        if span < self.config.min_diopter_span || (span <= 0.0 && self.config.zone_count > 1) {
            return Err(CalibrationError::insufficient_range(
                span,
                self.config.min_diopter_span,
            ));
        }
        Ok(self.calibrate(ZoneMap::partition(min, max, self.config.zone_count)))
    }

    /// Ends Discovery with one zone covering the whole observed range.
    pub fn finish_single_zone(&mut self) -> Result<ZoneMap, CalibrationError> {
        let (min, max) = self.observed_range()?;
        Ok(self.calibrate(ZoneMap::partition(min, max, 1)))
    }

    /// Sweep-phase lookup; `None` when not calibrated or out of range.
    pub fn zone_for(&self, diopter: f64) -> Option<FocalZone> {
        self.zones()?.zone_for(diopter)
    }

    fn observed_range(&self) -> Result<(f64, f64), CalibrationError> {
        match &self.phase {
            CalibratorPhase::Discovering(run) => run.range().ok_or(CalibrationError::NoSamples),
            _ => Err(CalibrationError::NotDiscovering),
        }
    }

    fn calibrate(&mut self, map: ZoneMap) -> ZoneMap {
        log_info!(
            "calibrated {} focal zone(s) over {:.3}..{:.3} D",
            map.len(),
            map.min(),
            map.max()
        );
        self.phase = CalibratorPhase::Calibrated(map.clone());
        map
    }
}

impl Default for FocalCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}
