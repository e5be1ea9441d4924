pub mod commands;
pub mod config;
pub mod controller;
mod machine;
pub mod state;

pub use commands::{CommandKind, OperatorCommand};
pub use config::CaptureConfig;
pub use controller::{CaptureController, EngineStatus};
pub use machine::CaptureStateMachine;
pub use state::{CalibrationSession, CapturePhase, EngineEvent, SweepRun};
