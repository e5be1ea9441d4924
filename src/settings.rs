use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::calibration::CalibrationConfig;
use crate::capture::CaptureConfig;
use crate::error::EngineError;
use crate::orientation::TrackerConfig;
use crate::stability::StabilityConfig;
use crate::telemetry::TelemetryConfig;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Every tunable of the engine, one section per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub tracker: TrackerConfig,
    pub stability: StabilityConfig,
    pub calibration: CalibrationConfig,
    pub capture: CaptureConfig,
    pub telemetry: TelemetryConfig,
}

impl EngineConfig {
    /// Rejects values the components cannot operate with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let tracker = &self.tracker;
        if !(tracker.smoothing_time_constant_ms >= 0.0) {
            return Err(EngineError::invalid_config(
                "tracker.smoothing_time_constant_ms must be >= 0",
            ));
        }
        if !(tracker.disagreement_threshold_deg > 0.0) {
            return Err(EngineError::invalid_config(
                "tracker.disagreement_threshold_deg must be > 0",
            ));
        }
        for (name, value) in [
            ("tracker.confidence_decay", tracker.confidence_decay),
            ("tracker.confidence_recovery", tracker.confidence_recovery),
            ("capture.confidence_floor", self.capture.confidence_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::invalid_config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let stability = &self.stability;
        if stability.hold_duration_ms == 0 {
            return Err(EngineError::invalid_config("stability.hold_duration_ms must be > 0"));
        }
        if !(stability.jitter_threshold > 0.0) {
            return Err(EngineError::invalid_config("stability.jitter_threshold must be > 0"));
        }
        if !(stability.max_angular_rate_dps > 0.0) {
            return Err(EngineError::invalid_config(
                "stability.max_angular_rate_dps must be > 0",
            ));
        }

        if self.calibration.zone_count == 0 {
            return Err(EngineError::invalid_config("calibration.zone_count must be >= 1"));
        }
        if !(self.calibration.min_diopter_span > 0.0) {
            return Err(EngineError::invalid_config(
                "calibration.min_diopter_span must be > 0",
            ));
        }

        if self.capture.stall_window_ms == 0 {
            return Err(EngineError::invalid_config("capture.stall_window_ms must be > 0"));
        }
        if self.capture.lens_index > 2 {
            return Err(EngineError::invalid_config(format!(
                "capture.lens_index must be 0, 1 or 2, got {}",
                self.capture.lens_index
            )));
        }

        let telemetry = &self.telemetry;
        if !(telemetry.max_rate_hz > 0.0) {
            return Err(EngineError::invalid_config("telemetry.max_rate_hz must be > 0"));
        }
        if !(telemetry.sector_width_deg > 0.0 && telemetry.sector_width_deg <= 360.0) {
            return Err(EngineError::invalid_config(
                "telemetry.sector_width_deg must be within (0, 360]",
            ));
        }
        Ok(())
    }
}

/// JSON-file backed [`EngineConfig`].
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineConfig>,
}

impl SettingsStore {
    /// Opens the store. A missing file yields defaults; an unreadable or invalid
    /// one is logged and replaced by defaults on the next write.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<EngineConfig>(&contents) {
                Ok(config) if config.validate().is_ok() => config,
                Ok(_) | Err(_) => {
                    log_warn!(
                        "settings at {} are invalid; falling back to defaults",
                        path.display()
                    );
                    EngineConfig::default()
                }
            }
        } else {
            EngineConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.read().clone()
    }

    /// Validates, stores and persists `config`. Rejected configs change nothing.
    pub fn update(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        {
            let mut guard = self.write();
            self.persist(&config)?;
            *guard = config;
        }
        log_info!("settings saved to {}", self.path.display());
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &EngineConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineConfig> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineConfig> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
