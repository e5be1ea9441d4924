mod coverage;
mod emitter;
mod types;

pub use coverage::{CoverageSnapshot, SectorCoverage};
pub use emitter::{dropped_since, TelemetryConfig, TelemetryEmitter};
pub use types::{FrameKind, TelemetryFrame};
