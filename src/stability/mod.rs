mod gate;

pub use gate::{StabilityConfig, StabilityGate, StabilitySnapshot, SteadyState};
