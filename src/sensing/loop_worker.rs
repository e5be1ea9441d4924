use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureStateMachine, EngineEvent, EngineStatus, OperatorCommand};
use crate::error::EngineError;
use crate::models::SensorSample;
use crate::telemetry::TelemetryEmitter;

use super::capabilities::{ShutterSink, TelemetrySink};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Floor for the housekeeping tick so a very high telemetry rate cannot spin
/// the loop.
const MIN_TICK_MS: u64 = 10;

/// Operator command plus the channel its outcome is reported on.
pub(crate) struct CommandRequest {
    pub command: OperatorCommand,
    pub reply: oneshot::Sender<Result<Vec<EngineEvent>, EngineError>>,
}

/// Sensor-time clock that keeps running between samples.
///
/// Sensor timestamps only advance when a sample arrives; when every stream goes
/// quiet the stall check still needs a notion of "now", so the newest sensor
/// timestamp is extrapolated with the local monotonic clock.
#[derive(Debug, Default)]
struct SensorClock {
    anchor: Option<(u64, Instant)>,
}

impl SensorClock {
    fn observe(&mut self, timestamp_ms: u64) {
        if self.anchor.map_or(true, |(last, _)| timestamp_ms >= last) {
            self.anchor = Some((timestamp_ms, Instant::now()));
        }
    }

    fn now_ms(&self) -> Option<u64> {
        self.anchor
            .map(|(timestamp_ms, at)| timestamp_ms + at.elapsed().as_millis() as u64)
    }
}

/// Everything the decision task owns. Built by the controller, consumed by
/// [`DecisionWorker::run`].
pub struct DecisionWorker {
    pub(crate) machine: CaptureStateMachine,
    pub(crate) emitter: TelemetryEmitter,
    pub(crate) samples: mpsc::UnboundedReceiver<SensorSample>,
    pub(crate) commands: mpsc::Receiver<CommandRequest>,
    pub(crate) status: watch::Sender<EngineStatus>,
    pub(crate) shutter: Box<dyn ShutterSink>,
    pub(crate) telemetry: Box<dyn TelemetrySink>,
}

impl DecisionWorker {
    /// Serializes commands and samples onto the machine until cancelled or
    /// until every controller handle is gone. Returns the machine for
    /// inspection.
    pub async fn run(mut self, cancel_token: CancellationToken) -> CaptureStateMachine {
        let tick_ms = self.emitter.min_interval_ms().max(MIN_TICK_MS);
        let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut clock = SensorClock::default();
        log_info!("decision loop started (tick {tick_ms} ms)");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    log_info!("decision loop shutting down");
                    break;
                }
                request = self.commands.recv() => {
                    let Some(CommandRequest { command, reply }) = request else {
                        log_info!("all controller handles dropped; decision loop exiting");
                        break;
                    };
                    let outcome = self
                        .machine
                        .apply(command)
                        .map(|events| self.dispatch(events));
                    if reply.send(outcome).is_err() {
                        log_debug!("command caller went away before the reply");
                    }
                    self.publish_status();
                }
                Some(sample) = self.samples.recv() => {
                    clock.observe(sample.timestamp_ms());
                    let events = self.machine.handle(sample);
                    self.dispatch(events);
                    self.publish_status();
                }
                _ = ticker.tick() => {
                    let now_ms = clock
                        .now_ms()
                        .unwrap_or(0)
                        .max(self.machine.latest_ms());
                    let events = self.machine.check_stall(now_ms);
                    if !events.is_empty() {
                        self.dispatch(events);
                        self.publish_status();
                    }
                    if let Some(frame) = self.emitter.snapshot(&self.machine, now_ms) {
                        self.telemetry.send(frame);
                    }
                }
            }
        }

        self.machine
    }

    /// Fires the shutter and an out-of-band frame for every capture, then hands
    /// the events back for the command reply.
    fn dispatch(&mut self, events: Vec<EngineEvent>) -> Vec<EngineEvent> {
        for event in &events {
            match event {
                EngineEvent::Captured { event: capture } => {
                    self.shutter.trigger_shutter(capture.clone(), capture.exif());
                    let frame = self.emitter.capture_frame(&self.machine, capture);
                    self.telemetry.send(frame);
                }
                EngineEvent::SensorStalled { stalled_for_ms, .. } => {
                    log_warn!("capture blocked: focus stream silent for {stalled_for_ms} ms");
                }
                _ => {}
            }
        }
        events
    }

    fn publish_status(&self) {
        let next = EngineStatus::from_machine(&self.machine);
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
