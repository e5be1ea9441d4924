//! Seams between the decision loop and the platform.
//!
//! The camera layer implements [`PoseSource`]/[`FocusSource`] to push sensor
//! callbacks into a [`SampleFeed`], and [`ShutterSink`] to fire the shutter. The
//! transport layer implements [`TelemetrySink`]. Channel-backed implementations
//! are provided for wiring and tests.

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::models::{
    CaptureEvent, ExifPayload, FocusSample, JitterSample, RotationVector, SensorSample,
};
use crate::telemetry::TelemetryFrame;

/// Fires the camera shutter. Must not block: the decision loop calls it inline.
pub trait ShutterSink: Send {
    fn trigger_shutter(&self, event: CaptureEvent, exif: ExifPayload);
}

/// Ships telemetry frames to the live preview. Fire-and-forget.
pub trait TelemetrySink: Send {
    fn send(&self, frame: TelemetryFrame);
}

/// Delivers rotation-vector and jitter readings.
pub trait PoseSource {
    fn attach(&mut self, feed: SampleFeed) -> Result<()>;
    fn detach(&mut self);
}

/// Delivers lens focus readings.
pub trait FocusSource {
    fn attach(&mut self, feed: SampleFeed) -> Result<()>;
    fn detach(&mut self);
}

/// Producer half of the decision loop's sample queue. Cheap to clone; safe to
/// call from any thread.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    tx: mpsc::UnboundedSender<SensorSample>,
}

impl SampleFeed {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SensorSample>) -> Self {
        Self { tx }
    }

    /// Queues a sample. Returns `false` once the decision loop has stopped.
    pub fn push(&self, sample: SensorSample) -> bool {
        self.tx.send(sample).is_ok()
    }

    pub fn rotation(&self, raw: RotationVector) -> bool {
        self.push(SensorSample::Rotation(raw))
    }

    pub fn focus(&self, diopter: f64, timestamp_ms: u64) -> bool {
        self.push(SensorSample::Focus(FocusSample::new(diopter, timestamp_ms)))
    }

    pub fn jitter(&self, magnitude: f64, timestamp_ms: u64) -> bool {
        self.push(SensorSample::Jitter(JitterSample::new(magnitude, timestamp_ms)))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Forwards shutter triggers into a channel.
#[derive(Debug, Clone)]
pub struct ChannelShutter {
    tx: mpsc::UnboundedSender<(CaptureEvent, ExifPayload)>,
}

impl ChannelShutter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(CaptureEvent, ExifPayload)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ShutterSink for ChannelShutter {
    fn trigger_shutter(&self, event: CaptureEvent, exif: ExifPayload) {
        let _ = self.tx.send((event, exif));
    }
}

/// Forwards telemetry frames into a channel.
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
    tx: mpsc::UnboundedSender<TelemetryFrame>,
}

impl ChannelTelemetry {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TelemetryFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn send(&self, frame: TelemetryFrame) {
        let _ = self.tx.send(frame);
    }
}

/// Discards frames; for hosts without a live preview.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn send(&self, _frame: TelemetryFrame) {}
}

/// Replays a fixed sequence of samples on attach. Serves as both a pose and a
/// focus source, e.g. for recorded sessions.
#[derive(Debug, Clone, Default)]
pub struct RecordedSource {
    samples: Vec<SensorSample>,
    feed: Option<SampleFeed>,
}

impl RecordedSource {
    pub fn new(samples: Vec<SensorSample>) -> Self {
        Self {
            samples,
            feed: None,
        }
    }

    fn replay(&mut self, feed: SampleFeed) -> Result<()> {
        if self.feed.is_some() {
            return Err(anyhow!("recorded source already attached"));
        }
        for sample in &self.samples {
            if !feed.push(*sample) {
                return Err(anyhow!("decision loop stopped during replay"));
            }
        }
        self.feed = Some(feed);
        Ok(())
    }
}

impl PoseSource for RecordedSource {
    fn attach(&mut self, feed: SampleFeed) -> Result<()> {
        self.replay(feed)
    }

    fn detach(&mut self) {
        self.feed = None;
    }
}

impl FocusSource for RecordedSource {
    fn attach(&mut self, feed: SampleFeed) -> Result<()> {
        self.replay(feed)
    }

    fn detach(&mut self) {
        self.feed = None;
    }
}
