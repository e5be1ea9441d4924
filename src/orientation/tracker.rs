use serde::{Deserialize, Serialize};

use crate::models::{PoseSample, RotationVector};

use super::angle::{angular_distance, delta_deg, wrap_degrees};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Weight of each new squared residual in the running variance.
const VARIANCE_WEIGHT: f64 = 0.1;

/// Tunables for pose smoothing and confidence tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Low-pass time constant; zero disables smoothing.
    pub smoothing_time_constant_ms: f64,

    /// Consecutive raw readings further apart than this count as disagreement
    pub disagreement_threshold_deg: f64,

    /// Confidence lost per disagreeing reading
    pub confidence_decay: f64,
    /// Confidence regained per agreeing reading
    pub confidence_recovery: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing_time_constant_ms: 150.0,
            disagreement_threshold_deg: 15.0,
            confidence_decay: 0.2,
            confidence_recovery: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Angles {
    azimuth_deg: f64,
    pitch_deg: f64,
    timestamp_ms: u64,
}

impl Angles {
    fn from_rotation(raw: &RotationVector) -> Self {
        let r = raw.rotation_matrix();
        Self {
            azimuth_deg: wrap_degrees(r[1].atan2(r[4]).to_degrees()),
            pitch_deg: (-r[7]).clamp(-1.0, 1.0).asin().to_degrees(),
            timestamp_ms: raw.timestamp_ms,
        }
    }

    fn disagreement(&self, other: &Angles) -> f64 {
        angular_distance(self.azimuth_deg, other.azimuth_deg)
            .max((self.pitch_deg - other.pitch_deg).abs())
    }
}

/// Maps pitch in degrees onto the 0-100 altitude scale used by the dashboard.
fn altitude_from_pitch(pitch_deg: f64) -> f64 {
    ((pitch_deg + 90.0) / 180.0 * 100.0).clamp(0.0, 100.0)
}

/// Smooths raw rotation vectors into [`PoseSample`]s.
///
/// One call per sensor callback, constant time, no allocation.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    config: TrackerConfig,
    estimate: Option<Angles>,
    last_raw: Option<Angles>,
    confidence: f64,
    azimuth_variance: f64,
    altitude_variance: f64,
}

impl OrientationTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            estimate: None,
            last_raw: None,
            confidence: 1.0,
            azimuth_variance: 0.0,
            altitude_variance: 0.0,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Latest smoothed pose, if any reading has been accepted.
    pub fn latest(&self) -> Option<PoseSample> {
        self.estimate.map(|est| self.pose_from(est, est.timestamp_ms))
    }

    pub fn reset(&mut self) {
        self.estimate = None;
        self.last_raw = None;
        self.confidence = 1.0;
        self.azimuth_variance = 0.0;
        self.altitude_variance = 0.0;
    }

    pub fn update(&mut self, raw: &RotationVector) -> PoseSample {
        if !raw.is_finite() {
            log_debug!("non-finite rotation vector at {} ms ignored", raw.timestamp_ms);
            self.decay_confidence();
            return self.pose_at(raw.timestamp_ms);
        }

        let angles = Angles::from_rotation(raw);

        if let Some(previous) = self.last_raw {
            if angles.disagreement(&previous) > self.config.disagreement_threshold_deg {
                self.decay_confidence();
            } else {
                self.confidence = (self.confidence + self.config.confidence_recovery).min(1.0);
            }
        }
        self.last_raw = Some(angles);

        let next = match self.estimate {
            None => angles,
            Some(est) => {
                let alpha = self.smoothing_factor(est.timestamp_ms, angles.timestamp_ms);
                let smoothed = Angles {
                    azimuth_deg: wrap_degrees(
                        est.azimuth_deg + alpha * delta_deg(est.azimuth_deg, angles.azimuth_deg),
                    ),
                    pitch_deg: est.pitch_deg + alpha * (angles.pitch_deg - est.pitch_deg),
                    timestamp_ms: angles.timestamp_ms.max(est.timestamp_ms),
                };

                if alpha > 0.0 {
                    let az_residual = delta_deg(smoothed.azimuth_deg, angles.azimuth_deg);
                    let alt_residual =
                        altitude_from_pitch(angles.pitch_deg) - altitude_from_pitch(smoothed.pitch_deg);
                    self.azimuth_variance +=
                        VARIANCE_WEIGHT * (az_residual * az_residual - self.azimuth_variance);
                    self.altitude_variance +=
                        VARIANCE_WEIGHT * (alt_residual * alt_residual - self.altitude_variance);
                }
                smoothed
            }
        };

        self.estimate = Some(next);
        self.pose_from(next, next.timestamp_ms)
    }

    fn smoothing_factor(&self, previous_ms: u64, current_ms: u64) -> f64 {
        let tau = self.config.smoothing_time_constant_ms;
        if tau <= 0.0 {
            return 1.0;
        }
        let dt = current_ms.saturating_sub(previous_ms) as f64;
        dt / (tau + dt)
    }

    fn decay_confidence(&mut self) {
        self.confidence = (self.confidence - self.config.confidence_decay).max(0.0);
    }

    fn pose_at(&self, timestamp_ms: u64) -> PoseSample {
        match self.estimate {
            Some(est) => self.pose_from(est, timestamp_ms),
            None => PoseSample {
                azimuth_deg: 0.0,
                altitude: 50.0,
                timestamp_ms,
                confidence: self.confidence,
                azimuth_variance: self.azimuth_variance,
                altitude_variance: self.altitude_variance,
            },
        }
    }

    fn pose_from(&self, angles: Angles, timestamp_ms: u64) -> PoseSample {
        PoseSample {
            azimuth_deg: angles.azimuth_deg,
            altitude: altitude_from_pitch(angles.pitch_deg),
            timestamp_ms,
            confidence: self.confidence,
            azimuth_variance: self.azimuth_variance,
            altitude_variance: self.altitude_variance,
        }
    }
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
