//! Error types for the capture engine.

use thiserror::Error;

use crate::capture::{CapturePhase, CommandKind};

/// Errors raised when a Discovery run cannot be turned into focal zones.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// The observed diopter span is too small to need multi-focus capture.
    #[error("insufficient focus range: span {span:.3} D is below the required {required:.3} D")]
    InsufficientRange {
        /// Observed `max - min` in diopters.
        span: f64,
        /// Configured minimum span.
        required: f64,
    },

    /// Discovery finished before any usable focus sample arrived.
    #[error("no focus samples recorded during discovery")]
    NoSamples,

    /// The calibrator is not running a Discovery pass.
    #[error("calibrator is not discovering")]
    NotDiscovering,
}

impl CalibrationError {
    /// Creates an insufficient range error.
    #[must_use]
    pub const fn insufficient_range(span: f64, required: f64) -> Self {
        Self::InsufficientRange { span, required }
    }
}

/// Errors surfaced by the engine to the operator-facing layer.
///
/// None of these are fatal: the engine always stays in a well-defined phase.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Operator command issued in a phase that does not support it.
    #[error("cannot {command} while {phase}")]
    InvalidTransition {
        /// The rejected command.
        command: CommandKind,
        /// Phase the machine was in (unchanged).
        phase: CapturePhase,
    },

    /// Calibration could not complete.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Zone index outside the calibrated zone list.
    #[error("zone {index} does not exist ({zone_count} zones calibrated)")]
    InvalidZone {
        /// Requested index.
        index: usize,
        /// Number of calibrated zones.
        zone_count: usize,
    },

    /// No fresh focus samples within the stall window.
    #[error("focus sensor stalled for {stalled_for_ms} ms")]
    SensorStalled {
        /// Time since the last focus sample.
        stalled_for_ms: u64,
    },

    /// A signal required for the request has not been observed yet.
    #[error("{0} signal unavailable")]
    SignalUnavailable(&'static str),

    /// Engine configuration rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The decision loop is no longer running.
    #[error("capture controller stopped")]
    ControllerStopped,
}

impl EngineError {
    /// Creates an invalid transition error.
    #[must_use]
    pub const fn invalid_transition(command: CommandKind, phase: CapturePhase) -> Self {
        Self::InvalidTransition { command, phase }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_range_message_carries_span() {
        let err = CalibrationError::insufficient_range(0.25, 0.5);
        let msg = err.to_string();
        assert!(msg.contains("insufficient focus range"));
        assert!(msg.contains("0.250"));
        assert!(msg.contains("0.500"));
    }

    #[test]
    fn invalid_transition_names_command_and_phase() {
        let err = EngineError::invalid_transition(CommandKind::StartSweep, CapturePhase::Idle);
        assert_eq!(err.to_string(), "cannot start_sweep while idle");
    }

    #[test]
    fn calibration_error_converts_transparently() {
        let err: EngineError = CalibrationError::NoSamples.into();
        assert_eq!(err.to_string(), "no focus samples recorded during discovery");
    }
}
