//! Focal range calibration: Discovery of the in-focus diopter span and its
//! partition into focal zones.

mod calibrator;
pub mod config;
mod zones;

pub use calibrator::{CalibratorPhase, DiscoveryRun, FocalCalibrator};
pub use config::CalibrationConfig;
pub use zones::{FocalZone, ZoneMap};
