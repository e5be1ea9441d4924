//! Auto-capture decision engine for photogrammetry.
//!
//! Sensor samples (rotation vector, accelerometer jitter, lens focus) flow into a
//! single-threaded [`CaptureStateMachine`] that tracks device pose, waits for a
//! motion-free hold inside each calibrated focal zone, and fires exactly one
//! capture per zone. [`CaptureController`] runs the machine on a tokio task.

pub mod calibration;
pub mod capture;
pub mod error;
pub mod models;
pub mod orientation;
pub mod replay;
pub mod sensing;
pub mod settings;
pub mod stability;
pub mod telemetry;
mod utils;

pub use calibration::{CalibrationConfig, FocalCalibrator, FocalZone, ZoneMap};
pub use capture::{
    CaptureConfig, CaptureController, CapturePhase, CaptureStateMachine, EngineEvent,
    EngineStatus, OperatorCommand,
};
pub use error::{CalibrationError, EngineError};
pub use models::{
    CaptureEvent, ExifPayload, FocusSample, JitterSample, PoseSample, RotationVector,
    SensorSample,
};
pub use orientation::{OrientationTracker, TrackerConfig};
pub use sensing::{
    ChannelShutter, ChannelTelemetry, FocusSource, NullTelemetry, PoseSource, RecordedSource,
    SampleFeed, ShutterSink, TelemetrySink,
};
pub use settings::{EngineConfig, SettingsStore};
pub use stability::{StabilityConfig, StabilityGate, StabilitySnapshot};
pub use telemetry::{TelemetryConfig, TelemetryEmitter, TelemetryFrame};

/// Installs `env_logger` (reads `RUST_LOG`, defaults to info). Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
