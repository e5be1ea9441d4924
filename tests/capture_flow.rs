use focal_capture_lib::{
    replay, CaptureEvent, CapturePhase, CaptureStateMachine, EngineConfig, EngineEvent,
    FocusSample, JitterSample, OperatorCommand, RotationVector, TelemetryEmitter,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Quaternion for a device held level and facing `azimuth_deg`.
fn facing(azimuth_deg: f64, timestamp_ms: u64) -> RotationVector {
    let half = (-azimuth_deg).to_radians() / 2.0;
    RotationVector::new(0.0, 0.0, half.sin(), Some(half.cos()), timestamp_ms)
}

fn captures(events: &[EngineEvent]) -> Vec<CaptureEvent> {
    events.iter().filter_map(|e| e.capture().cloned()).collect()
}

/// Runs Discovery over `[near, far]` diopters and returns a machine in ZonesReady.
fn discover(near: f64, far: f64) -> CaptureStateMachine {
    let mut machine = CaptureStateMachine::new(EngineConfig::default());
    machine.on_rotation(&facing(0.0, 0));
    machine.apply(OperatorCommand::StartDiscovery).unwrap();
    let steps = 20;
    for i in 0..=steps {
        let diopter = near + (far - near) * i as f64 / steps as f64;
        machine.on_focus(FocusSample::new(diopter, 10 + i as u64 * 20));
    }
    machine.apply(OperatorCommand::FinishDiscovery).unwrap();
    machine
}

/// Holds the device still at `azimuth_deg` with the lens at `diopter` over
/// `[from, to]`, feeding all three streams at realistic rates.
fn dwell(
    machine: &mut CaptureStateMachine,
    azimuth_deg: f64,
    diopter: f64,
    from: u64,
    to: u64,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    let mut t = from;
    while t <= to {
        if t % 20 == 0 {
            events.extend(machine.on_rotation(&facing(azimuth_deg, t)));
        }
        if t % 100 == 0 {
            events.extend(machine.on_focus(FocusSample::new(diopter, t)));
        }
        events.extend(machine.on_jitter(JitterSample::new(0.03, t)));
        t += 10;
    }
    events
}

#[test]
fn full_session_captures_each_zone_once() {
    let mut machine = discover(2.0, 6.0);
    assert_eq!(machine.zones().unwrap().len(), 4);
    machine.apply(OperatorCommand::StartSweep).unwrap();

    let mut shots = Vec::new();
    let mut t = 1_000;
    for (azimuth, diopter) in [(0.0, 2.4), (0.0, 3.6), (0.0, 4.4), (0.0, 5.8)] {
        shots.extend(captures(&dwell(&mut machine, azimuth, diopter, t, t + 1_500)));
        t += 2_000;
    }

    let zones: Vec<_> = shots.iter().map(|shot| shot.zone_index).collect();
    assert_eq!(zones, vec![Some(0), Some(1), Some(2), Some(3)]);
    let ids: Vec<_> = shots.iter().map(|shot| shot.sequence_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(machine.phase(), CapturePhase::Complete);

    let exif = shots[1].exif();
    assert_eq!(exif.heading, 0.0);
    assert_eq!(exif.altitude, 50.0);
    assert_eq!(exif.focus_distance, 0.278);
}

#[test]
fn complete_only_when_every_zone_is_captured() {
    let mut machine = discover(2.0, 6.0);
    machine.apply(OperatorCommand::StartSweep).unwrap();

    let mut t = 1_000;
    for diopter in [2.4, 3.6, 4.4] {
        dwell(&mut machine, 0.0, diopter, t, t + 1_500);
        assert_ne!(machine.phase(), CapturePhase::Complete);
        t += 2_000;
    }
    // revisiting a captured zone does not help
    let events = dwell(&mut machine, 0.0, 2.4, t, t + 3_000);
    assert!(captures(&events).is_empty());
    assert_eq!(machine.phase(), CapturePhase::Sweeping);
    assert_eq!(machine.zones().unwrap().captured_count(), 3);
}

#[test]
fn rotating_device_never_captures() {
    let mut machine = discover(2.0, 6.0);
    machine.apply(OperatorCommand::StartSweep).unwrap();

    let mut events = Vec::new();
    let mut t = 1_000;
    let mut azimuth = 0.0;
    while t <= 5_000 {
        // 50°/s sweep with a perfectly still accelerometer
        azimuth += 1.0;
        events.extend(machine.on_rotation(&facing(azimuth, t)));
        if t % 100 == 0 {
            events.extend(machine.on_focus(FocusSample::new(2.4, t)));
        }
        events.extend(machine.on_jitter(JitterSample::new(0.01, t)));
        t += 20;
    }
    assert!(captures(&events).is_empty());
    assert_eq!(machine.phase(), CapturePhase::AwaitingZone { zone: 0 });
}

#[test]
fn noisy_heading_still_captures_with_coverage() {
    let mut machine = discover(2.0, 6.0);
    machine.apply(OperatorCommand::StartSweep).unwrap();
    let mut rng = StdRng::seed_from_u64(11);

    let mut events = Vec::new();
    let mut t = 1_000;
    while t <= 3_000 {
        if t % 20 == 0 {
            let noisy = 95.0 + rng.gen_range(-0.5..0.5);
            events.extend(machine.on_rotation(&facing(noisy, t)));
        }
        if t % 100 == 0 {
            events.extend(machine.on_focus(FocusSample::new(2.4, t)));
        }
        events.extend(machine.on_jitter(JitterSample::new(0.02, t)));
        t += 10;
    }

    let shots = captures(&events);
    assert_eq!(shots.len(), 1);
    assert!((shots[0].pose.azimuth_deg - 95.0).abs() < 2.0);

    let coverage = machine.coverage().unwrap();
    assert_eq!(coverage.sectors, vec![9]);
    assert!((coverage.percent - 100.0 / 36.0).abs() < 1e-9);
}

#[test]
fn abort_mid_hold_emits_nothing_and_starts_over() {
    let mut machine = discover(2.0, 6.0);
    machine.apply(OperatorCommand::StartSweep).unwrap();
    dwell(&mut machine, 0.0, 2.4, 1_000, 2_100);
    assert_eq!(machine.phase(), CapturePhase::AwaitingZone { zone: 0 });

    let events = machine.apply(OperatorCommand::Abort).unwrap();
    assert!(captures(&events).is_empty());
    assert_eq!(machine.phase(), CapturePhase::Idle);
    assert!(machine.zones().is_none());

    machine.apply(OperatorCommand::StartDiscovery).unwrap();
    assert_eq!(machine.phase(), CapturePhase::Discovering);
}

#[test]
fn telemetry_follows_the_session() {
    let mut machine = discover(2.0, 6.0);
    machine.apply(OperatorCommand::StartSweep).unwrap();
    let mut emitter = TelemetryEmitter::default();

    let events = dwell(&mut machine, 0.0, 3.6, 1_000, 2_500);
    let shots = captures(&events);
    let capture_frame = emitter.capture_frame(&machine, &shots[0]);
    let periodic = emitter.snapshot(&machine, 2_500).unwrap();

    assert!(periodic.sequence_id > capture_frame.sequence_id);
    assert_eq!(periodic.zones.len(), 4);
    assert!(periodic.zones[1].captured);
    assert_eq!(periodic.captured_zones(), 1);
    assert!(periodic.stability.is_steady);
    assert_eq!(periodic.session_id, machine.session().map(|s| s.id.clone()));
}

#[test]
fn replay_drives_the_same_flow() {
    let mut lines = vec![
        r#"{"type":"rotation","x":0.0,"y":0.0,"z":0.0,"w":1.0,"timestampMs":0}"#.to_string(),
        r#"{"type":"command","command":"start_discovery"}"#.to_string(),
        r#"{"type":"focus","diopter":1.0,"timestampMs":10}"#.to_string(),
        r#"{"type":"focus","diopter":3.0,"timestampMs":20}"#.to_string(),
        r#"{"type":"command","command":"finish_single_zone"}"#.to_string(),
        r#"{"type":"command","command":"start_sweep"}"#.to_string(),
    ];
    for t in (100..=1_400).step_by(10) {
        if t % 100 == 0 {
            lines.push(format!(r#"{{"type":"focus","diopter":2.0,"timestampMs":{t}}}"#));
        }
        lines.push(format!(r#"{{"type":"jitter","magnitude":0.01,"timestampMs":{t}}}"#));
    }
    let text = lines.join("\n");

    let entries = replay::parse_recording(text.as_bytes()).unwrap();
    let report = replay::run(EngineConfig::default(), &entries).unwrap();
    assert_eq!(report.captures.len(), 1);
    assert_eq!(report.captures[0].zone_index, Some(0));
    assert_eq!(report.capture_frames.len(), 1);
    assert!(report.rejected.is_empty());
    let frame = report.final_frame.unwrap();
    assert_eq!(frame.phase, CapturePhase::Complete);
    assert_eq!(
        report.captures[0].exif().user_comment(),
        r#"{"heading":0.0,"altitude":50.0,"focus_distance":0.5}"#
    );
}
