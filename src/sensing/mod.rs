pub mod capabilities;
mod controller;
mod loop_worker;

pub use capabilities::{
    ChannelShutter, ChannelTelemetry, FocusSource, NullTelemetry, PoseSource, RecordedSource,
    SampleFeed, ShutterSink, TelemetrySink,
};
pub use controller::SensingController;
pub(crate) use loop_worker::CommandRequest;
pub use loop_worker::DecisionWorker;
