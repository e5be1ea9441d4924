use std::{env, fs::File, io::BufReader, path::PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::json;

use focal_capture_lib::{init_logging, replay, EngineConfig, SettingsStore};

fn main() -> Result<()> {
    init_logging();

    let mut args = env::args().skip(1);
    let Some(recording) = args.next().map(PathBuf::from) else {
        bail!("usage: capture-replay <recording.jsonl> [settings.json]");
    };
    let config = match args.next() {
        Some(path) => SettingsStore::new(PathBuf::from(path))?.config(),
        None => EngineConfig::default(),
    };

    let file = File::open(&recording)
        .with_context(|| format!("Failed to open recording {}", recording.display()))?;
    let entries = replay::parse_recording(BufReader::new(file))?;
    info!("replaying {} entries from {}", entries.len(), recording.display());

    let report = replay::run(config, &entries)?;

    for capture in &report.captures {
        let line = json!({
            "capture": capture,
            "userComment": capture.exif().user_comment(),
        });
        println!("{line}");
    }
    for (command, reason) in &report.rejected {
        println!("{}", json!({ "rejected": command, "reason": reason }));
    }
    if let Some(frame) = &report.final_frame {
        println!("{}", serde_json::to_string_pretty(frame)?);
    }

    info!(
        "{} capture(s), {} rejected command(s)",
        report.captures.len(),
        report.rejected.len()
    );
    Ok(())
}
