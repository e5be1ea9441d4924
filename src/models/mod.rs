mod capture;
mod focus;
mod pose;
mod sample;

pub use capture::{CaptureEvent, ExifPayload};
pub use focus::{FocusSample, JitterSample};
pub use pose::{PoseSample, RotationVector};
pub use sample::SensorSample;
