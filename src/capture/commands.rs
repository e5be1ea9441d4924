use std::fmt;

use serde::{Deserialize, Serialize};

/// Operator commands accepted by the state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OperatorCommand {
    StartDiscovery,
    FinishDiscovery,
    /// Accept the discovered range as one zone, whatever its span.
    FinishSingleZone,
    StartSweep,
    RecaptureZone {
        index: usize,
    },
    Abort,
    Restart,
    /// Fire the shutter now, outside the zone logic.
    CaptureNow,
}

/// Payload-free command discriminant, used in errors and logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    StartDiscovery,
    FinishDiscovery,
    FinishSingleZone,
    StartSweep,
    RecaptureZone,
    Abort,
    Restart,
    CaptureNow,
}

impl OperatorCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            OperatorCommand::StartDiscovery => CommandKind::StartDiscovery,
            OperatorCommand::FinishDiscovery => CommandKind::FinishDiscovery,
            OperatorCommand::FinishSingleZone => CommandKind::FinishSingleZone,
            OperatorCommand::StartSweep => CommandKind::StartSweep,
            OperatorCommand::RecaptureZone { .. } => CommandKind::RecaptureZone,
            OperatorCommand::Abort => CommandKind::Abort,
            OperatorCommand::Restart => CommandKind::Restart,
            OperatorCommand::CaptureNow => CommandKind::CaptureNow,
        }
    }
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::StartDiscovery => "start_discovery",
            CommandKind::FinishDiscovery => "finish_discovery",
            CommandKind::FinishSingleZone => "finish_single_zone",
            CommandKind::StartSweep => "start_sweep",
            CommandKind::RecaptureZone => "recapture_zone",
            CommandKind::Abort => "abort",
            CommandKind::Restart => "restart",
            CommandKind::CaptureNow => "capture_now",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: OperatorCommand =
            serde_json::from_str(r#"{"command": "recapture_zone", "index": 3}"#).unwrap();
        assert_eq!(cmd, OperatorCommand::RecaptureZone { index: 3 });
        let cmd: OperatorCommand = serde_json::from_str(r#"{"command": "start_sweep"}"#).unwrap();
        assert_eq!(cmd.kind(), CommandKind::StartSweep);
    }

    #[test]
    fn kind_display_matches_wire_name() {
        assert_eq!(CommandKind::FinishSingleZone.to_string(), "finish_single_zone");
        let json = serde_json::to_string(&CommandKind::CaptureNow).unwrap();
        assert_eq!(json, "\"capture_now\"");
    }
}
