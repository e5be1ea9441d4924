//! Offline replay of recorded capture sessions.
//!
//! A recording is JSON lines, one entry per line, in arrival order:
//! ```text
//! {"type":"rotation","x":0.0,"y":0.0,"z":0.0,"w":1.0,"timestampMs":0}
//! {"type":"command","command":"start_discovery"}
//! {"type":"focus","diopter":2.5,"timestampMs":10}
//! {"type":"jitter","magnitude":0.02,"timestampMs":12}
//! ```
//! Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureStateMachine, EngineEvent, OperatorCommand};
use crate::models::{CaptureEvent, FocusSample, JitterSample, RotationVector, SensorSample};
use crate::settings::EngineConfig;
use crate::telemetry::{TelemetryEmitter, TelemetryFrame};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEntry {
    Rotation(RotationVector),
    Focus(FocusSample),
    Jitter(JitterSample),
    Command(OperatorCommand),
}

pub fn parse_recording(reader: impl BufRead) -> Result<Vec<ReplayEntry>> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid replay entry on line {}", index + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Outcome of one replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub captures: Vec<CaptureEvent>,
    pub capture_frames: Vec<TelemetryFrame>,
    /// Commands the machine refused, with the reason.
    pub rejected: Vec<(OperatorCommand, String)>,
    pub events: Vec<EngineEvent>,
    pub final_frame: Option<TelemetryFrame>,
}

/// Drives a fresh machine through `entries` synchronously.
pub fn run(config: EngineConfig, entries: &[ReplayEntry]) -> Result<ReplayReport> {
    config.validate()?;
    let mut emitter = TelemetryEmitter::new(&config.telemetry);
    let mut machine = CaptureStateMachine::new(config);
    let mut report = ReplayReport {
        captures: Vec::new(),
        capture_frames: Vec::new(),
        rejected: Vec::new(),
        events: Vec::new(),
        final_frame: None,
    };

    for entry in entries {
        let events = match *entry {
            ReplayEntry::Rotation(raw) => machine.handle(SensorSample::Rotation(raw)),
            ReplayEntry::Focus(focus) => machine.handle(SensorSample::Focus(focus)),
            ReplayEntry::Jitter(jitter) => machine.handle(SensorSample::Jitter(jitter)),
            ReplayEntry::Command(command) => match machine.apply(command) {
                Ok(events) => events,
                Err(err) => {
                    log_warn!("replay: {err}");
                    report.rejected.push((command, err.to_string()));
                    Vec::new()
                }
            },
        };

        for event in &events {
            if let Some(capture) = event.capture() {
                report.capture_frames.push(emitter.capture_frame(&machine, capture));
                report.captures.push(capture.clone());
            }
        }
        report.events.extend(events);
    }

    report.final_frame = emitter.snapshot(&machine, machine.latest_ms());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturePhase;

    #[test]
    fn parses_every_entry_kind() {
        let text = r#"
# level device
{"type":"rotation","x":0.0,"y":0.0,"z":0.0,"timestampMs":0}
{"type":"command","command":"recapture_zone","index":2}
{"type":"focus","diopter":2.5,"timestampMs":10}

{"type":"jitter","magnitude":0.02,"timestampMs":12}
"#;
        let entries = parse_recording(text.as_bytes()).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(matches!(entries[0], ReplayEntry::Rotation(raw) if raw.w.is_none()));
        assert_eq!(
            entries[1],
            ReplayEntry::Command(OperatorCommand::RecaptureZone { index: 2 })
        );
        assert_eq!(entries[2], ReplayEntry::Focus(FocusSample::new(2.5, 10)));
    }

    #[test]
    fn bad_line_reports_its_number() {
        let text = "{\"type\":\"focus\",\"diopter\":1.0,\"timestampMs\":0}\n{\"type\":\"warp\"}\n";
        let err = parse_recording(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejected_commands_are_reported() {
        let entries = [ReplayEntry::Command(OperatorCommand::StartSweep)];
        let report = run(EngineConfig::default(), &entries).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].1.contains("start_sweep"));
        let frame = report.final_frame.unwrap();
        assert_eq!(frame.phase, CapturePhase::Idle);
    }
}
