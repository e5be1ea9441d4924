use std::sync::Arc;

use anyhow::Result as AnyResult;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch, Mutex};

use crate::error::{EngineError, Result};
use crate::sensing::{
    CommandRequest, DecisionWorker, FocusSource, PoseSource, SampleFeed, SensingController,
    ShutterSink, TelemetrySink,
};
use crate::settings::EngineConfig;
use crate::telemetry::TelemetryEmitter;

use super::{CapturePhase, CaptureStateMachine, EngineEvent, OperatorCommand};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Pending operator commands beyond this make callers wait.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Coarse engine state published on every change.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub phase: CapturePhase,
    pub session_id: Option<String>,
    pub stalled: bool,
    /// Captured flag per focal zone; empty before calibration.
    pub occupancy: Vec<bool>,
    pub captures: u32,
    /// Newest sensor timestamp the loop has processed.
    pub latest_ms: u64,
}

impl EngineStatus {
    pub fn from_machine(machine: &CaptureStateMachine) -> Self {
        let session = machine.session();
        Self {
            phase: machine.phase(),
            session_id: session.map(|session| session.id.clone()),
            stalled: machine.is_stalled(),
            occupancy: machine
                .zones()
                .map(|zones| zones.occupancy())
                .unwrap_or_default(),
            captures: session
                .and_then(|session| session.sweep.as_ref())
                .map_or(0, |sweep| sweep.captures),
            latest_ms: machine.latest_ms(),
        }
    }
}

/// Cloneable handle to a running decision loop.
///
/// Commands are awaited until the loop has applied them. They are served ahead
/// of queued sensor samples, so callers that depend on earlier samples (e.g.
/// finishing Discovery) should wait for [`EngineStatus::latest_ms`] first.
#[derive(Clone)]
pub struct CaptureController {
    commands: mpsc::Sender<CommandRequest>,
    feed: SampleFeed,
    status: watch::Receiver<EngineStatus>,
    sensing: Arc<Mutex<SensingController>>,
}

impl CaptureController {
    /// Validates `config` and spawns the decision loop on the current runtime.
    pub fn start(
        config: EngineConfig,
        shutter: Box<dyn ShutterSink>,
        telemetry: Box<dyn TelemetrySink>,
    ) -> Result<Self> {
        config.validate()?;

        let (sample_tx, samples) = mpsc::unbounded_channel();
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (status_tx, status) = watch::channel(EngineStatus::default());

        let worker = DecisionWorker {
            emitter: TelemetryEmitter::new(&config.telemetry),
            machine: CaptureStateMachine::new(config),
            samples,
            commands: command_rx,
            status: status_tx,
            shutter,
            telemetry,
        };

        let mut sensing = SensingController::new();
        sensing
            .start(worker)
            .map_err(|_| EngineError::ControllerStopped)?;
        log_info!("capture controller started");

        Ok(Self {
            commands,
            feed: SampleFeed::new(sample_tx),
            status,
            sensing: Arc::new(Mutex::new(sensing)),
        })
    }

    /// Producer handle for sensor callbacks.
    pub fn feed(&self) -> SampleFeed {
        self.feed.clone()
    }

    pub fn attach_pose_source(&self, source: &mut dyn PoseSource) -> AnyResult<()> {
        source.attach(self.feed())
    }

    pub fn attach_focus_source(&self, source: &mut dyn FocusSource) -> AnyResult<()> {
        source.attach(self.feed())
    }

    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<EngineStatus> {
        self.status.clone()
    }

    /// Waits until the loop has processed samples up to `timestamp_ms`.
    pub async fn wait_for_samples(&self, timestamp_ms: u64) -> Result<EngineStatus> {
        let mut status = self.subscribe_status();
        let reached = status
            .wait_for(|status| status.latest_ms >= timestamp_ms)
            .await
            .map_err(|_| EngineError::ControllerStopped)?;
        Ok(reached.clone())
    }

    /// Applies one command on the loop and returns the events it produced.
    pub async fn send(&self, command: OperatorCommand) -> Result<Vec<EngineEvent>> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(CommandRequest { command, reply })
            .await
            .map_err(|_| EngineError::ControllerStopped)?;
        outcome.await.map_err(|_| EngineError::ControllerStopped)?
    }

    pub async fn start_discovery(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::StartDiscovery).await
    }

    pub async fn finish_discovery(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::FinishDiscovery).await
    }

    pub async fn finish_single_zone(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::FinishSingleZone).await
    }

    pub async fn start_sweep(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::StartSweep).await
    }

    pub async fn recapture_zone(&self, index: usize) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::RecaptureZone { index }).await
    }

    pub async fn abort(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::Abort).await
    }

    pub async fn restart(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::Restart).await
    }

    pub async fn capture_now(&self) -> Result<Vec<EngineEvent>> {
        self.send(OperatorCommand::CaptureNow).await
    }

    /// Stops the loop and returns the machine as it was at shutdown. Later
    /// commands fail with [`EngineError::ControllerStopped`].
    pub async fn shutdown(&self) -> AnyResult<Option<CaptureStateMachine>> {
        self.sensing.lock().await.stop().await
    }
}
