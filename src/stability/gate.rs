use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Tunables for the motion-stability hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StabilityConfig {
    /// Continuous motion-free time required before a capture may fire
    pub hold_duration_ms: u64,

    /// Jitter magnitude (m/s²) at or above which the device counts as moving
    pub jitter_threshold: f64,

    /// Heading/tilt rate above which the device counts as moving
    pub max_angular_rate_dps: f64,

    /// Longer silences between jitter samples restart the hold
    pub max_sample_gap_ms: u64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: 1200,
            jitter_threshold: 0.15,
            max_angular_rate_dps: 30.0,
            max_sample_gap_ms: 250,
        }
    }
}

/// Verdict returned for every observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SteadyState {
    pub is_steady: bool,
    pub held_for_ms: u64,
}

/// Read-only view of the rolling window for telemetry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StabilitySnapshot {
    pub is_steady: bool,
    pub held_for_ms: u64,
    pub peak_jitter: Option<f64>,
    pub sample_count: usize,
    pub suspended: bool,
    pub last_violation_ms: Option<u64>,
}

/// Decides whether the device has been motion-free for the hold duration.
///
/// The steady clock is anchored at the most recent violation (or restart) rather
/// than derived from which samples are still buffered, so stale samples sliding
/// out of the window can never produce an early verdict. Updates are amortized
/// O(1): old samples are evicted from the front and a monotonic deque keeps the
/// window peak.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    config: StabilityConfig,
    /// Start of the current clean interval.
    anchor_ms: Option<u64>,
    last_sample_ms: Option<u64>,
    latest_ms: u64,
    suspended_at: Option<u64>,
    last_violation_ms: Option<u64>,
    /// Clean samples within the hold window, oldest first.
    window: VecDeque<(u64, f64)>,
    /// Decreasing magnitudes; front is the window peak.
    peaks: VecDeque<(u64, f64)>,
}

impl StabilityGate {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            anchor_ms: None,
            last_sample_ms: None,
            latest_ms: 0,
            suspended_at: None,
            last_violation_ms: None,
            window: VecDeque::new(),
            peaks: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    /// Feeds one jitter magnitude.
    pub fn observe(&mut self, magnitude: f64, timestamp_ms: u64) -> SteadyState {
        if let Some(last) = self.last_sample_ms {
            if timestamp_ms < last {
                log_debug!("out-of-order jitter sample at {timestamp_ms} ms (last {last} ms) ignored");
                return self.state_at(self.latest_ms);
            }
        }
        self.latest_ms = self.latest_ms.max(timestamp_ms);

        if !magnitude.is_finite() || magnitude >= self.config.jitter_threshold {
            self.last_sample_ms = Some(timestamp_ms);
            self.violate(timestamp_ms);
            return self.state_at(timestamp_ms);
        }

        let gap = self
            .last_sample_ms
            .map(|last| timestamp_ms - last > self.config.max_sample_gap_ms)
            .unwrap_or(false);
        self.last_sample_ms = Some(timestamp_ms);

        if gap || self.anchor_ms.is_none() {
            self.restart(timestamp_ms);
        }

        self.push(timestamp_ms, magnitude);
        self.state_at(timestamp_ms)
    }

    /// Feeds the pose angular rate; only fast rotation affects the hold.
    pub fn observe_rotation_rate(&mut self, rate_dps: f64, timestamp_ms: u64) -> SteadyState {
        if !rate_dps.is_finite() || rate_dps > self.config.max_angular_rate_dps {
            if timestamp_ms >= self.anchor_ms.unwrap_or(0) {
                self.latest_ms = self.latest_ms.max(timestamp_ms);
                self.violate(timestamp_ms);
            }
        }
        self.state_at(self.latest_ms)
    }

    /// Re-arms the hold so that only clean time after `timestamp_ms` counts.
    pub fn restart(&mut self, timestamp_ms: u64) {
        self.anchor_ms = Some(timestamp_ms);
        self.latest_ms = self.latest_ms.max(timestamp_ms);
        self.suspended_at = None;
        self.window.clear();
        self.peaks.clear();
    }

    /// Freezes the hold timer without discarding the time already held.
    pub fn suspend(&mut self, timestamp_ms: u64) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(timestamp_ms.max(self.anchor_ms.unwrap_or(0)));
        }
    }

    /// Resumes a suspended hold; the suspended interval does not count.
    pub fn resume(&mut self, timestamp_ms: u64) {
        if let Some(suspended_at) = self.suspended_at.take() {
            if let Some(anchor) = self.anchor_ms.as_mut() {
                *anchor += timestamp_ms.saturating_sub(suspended_at);
            }
            self.latest_ms = self.latest_ms.max(timestamp_ms);
        }
    }

    /// Forgets everything, including the sample history.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn current(&self) -> SteadyState {
        self.state_at(self.latest_ms)
    }

    pub fn snapshot(&self) -> StabilitySnapshot {
        let state = self.current();
        StabilitySnapshot {
            is_steady: state.is_steady,
            held_for_ms: state.held_for_ms,
            peak_jitter: self.peaks.front().map(|(_, magnitude)| *magnitude),
            sample_count: self.window.len(),
            suspended: self.is_suspended(),
            last_violation_ms: self.last_violation_ms,
        }
    }

    fn violate(&mut self, timestamp_ms: u64) {
        self.last_violation_ms = Some(timestamp_ms);
        self.anchor_ms = Some(timestamp_ms);
        if let Some(suspended_at) = self.suspended_at.as_mut() {
            *suspended_at = timestamp_ms;
        }
        self.window.clear();
        self.peaks.clear();
    }

    fn push(&mut self, timestamp_ms: u64, magnitude: f64) {
        self.window.push_back((timestamp_ms, magnitude));
        while self.peaks.back().is_some_and(|(_, m)| *m <= magnitude) {
            self.peaks.pop_back();
        }
        self.peaks.push_back((timestamp_ms, magnitude));

        let horizon = timestamp_ms.saturating_sub(self.config.hold_duration_ms);
        while self.window.front().is_some_and(|(t, _)| *t < horizon) {
            self.window.pop_front();
        }
        while self.peaks.front().is_some_and(|(t, _)| *t < horizon) {
            self.peaks.pop_front();
        }
    }

    fn state_at(&self, now_ms: u64) -> SteadyState {
        let Some(anchor) = self.anchor_ms else {
            return SteadyState::default();
        };
        match self.suspended_at {
            Some(suspended_at) => SteadyState {
                is_steady: false,
                held_for_ms: suspended_at.saturating_sub(anchor),
            },
            None => {
                let held_for_ms = now_ms.saturating_sub(anchor);
                SteadyState {
                    is_steady: held_for_ms >= self.config.hold_duration_ms,
                    held_for_ms,
                }
            }
        }
    }
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(StabilityConfig::default())
    }
}
