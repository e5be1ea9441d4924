//! Pose tracking from the fused rotation-vector sensor.

pub mod angle;
mod tracker;

pub use angle::{angular_distance, delta_deg, wrap_degrees};
pub use tracker::{OrientationTracker, TrackerConfig};
