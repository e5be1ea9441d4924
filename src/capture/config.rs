use serde::{Deserialize, Serialize};

/// Tunables for the capture state machine itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Pose confidence below which an awaiting hold is suspended
    pub confidence_floor: f64,

    /// Sweeping without a focus sample for longer than this reports a stall
    pub stall_window_ms: u64,

    /// Lens that frames are captured with (0 ultra-wide, 1 wide, 2 tele)
    pub lens_index: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            stall_window_ms: 2000,
            lens_index: 1,
        }
    }
}
