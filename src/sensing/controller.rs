use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureStateMachine;

use super::loop_worker::DecisionWorker;

/// Owns the lifecycle of the decision task.
pub struct SensingController {
    handle: Option<JoinHandle<CaptureStateMachine>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    /// Spawns the decision loop on the current tokio runtime.
    pub fn start(&mut self, worker: DecisionWorker) -> Result<()> {
        if self.handle.is_some() {
            bail!("decision loop already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(worker.run(cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels the loop and waits for it. Returns the final machine state, or
    /// `None` when the loop was never started or was already stopped.
    pub async fn stop(&mut self) -> Result<Option<CaptureStateMachine>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                let machine = handle.await.context("decision loop task failed to join")?;
                info!("decision loop stopped in phase {}", machine.phase());
                Ok(Some(machine))
            }
            None => Ok(None),
        }
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SensingController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
