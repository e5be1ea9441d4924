use std::time::Duration;

use focal_capture_lib::telemetry::FrameKind;
use focal_capture_lib::{
    CaptureController, CapturePhase, ChannelShutter, ChannelTelemetry, EngineConfig, EngineError,
    EngineEvent, FocusSample, NullTelemetry, RecordedSource, RotationVector, SampleFeed,
    SensorSample,
};

/// Controller without a telemetry consumer.
fn start(shutter: ChannelShutter) -> CaptureController {
    CaptureController::start(EngineConfig::default(), Box::new(shutter), Box::new(NullTelemetry))
        .unwrap()
}

fn level(timestamp_ms: u64) -> RotationVector {
    RotationVector::new(0.0, 0.0, 0.0, Some(1.0), timestamp_ms)
}

/// Brings a fresh controller to Sweeping over a `[2, 6]` D range.
async fn sweeping(controller: &CaptureController) {
    let feed = controller.feed();
    feed.rotation(level(0));
    controller.start_discovery().await.unwrap();
    for (i, diopter) in [2.0, 3.0, 4.0, 5.0, 6.0].iter().enumerate() {
        feed.focus(*diopter, 10 + i as u64 * 10);
    }
    controller.wait_for_samples(50).await.unwrap();
    controller.finish_discovery().await.unwrap();
    controller.start_sweep().await.unwrap();
}

fn steady_hold(feed: &SampleFeed, diopter: f64, from: u64, to: u64) {
    let mut t = from;
    while t <= to {
        if t % 100 == 0 {
            feed.focus(diopter, t);
        }
        feed.jitter(0.02, t);
        t += 10;
    }
}

#[tokio::test]
async fn controller_fires_shutter_and_capture_frame() {
    let (shutter, mut shots) = ChannelShutter::channel();
    let (telemetry, mut frames) = ChannelTelemetry::channel();
    let controller = CaptureController::start(
        EngineConfig::default(),
        Box::new(shutter),
        Box::new(telemetry),
    )
    .unwrap();

    sweeping(&controller).await;
    assert_eq!(controller.status().phase, CapturePhase::Sweeping);

    steady_hold(&controller.feed(), 4.5, 1_000, 2_300);
    let status = controller.wait_for_samples(2_300).await.unwrap();
    assert_eq!(status.occupancy, vec![false, false, true, false]);
    assert_eq!(status.captures, 1);

    let (event, exif) = shots.recv().await.unwrap();
    assert_eq!(event.zone_index, Some(2));
    assert_eq!(exif.focus_distance, 0.222);
    assert!(shots.try_recv().is_err());

    let mut capture_frames = 0;
    while let Ok(frame) = frames.try_recv() {
        if frame.kind == FrameKind::Capture {
            capture_frames += 1;
            assert_eq!(frame.capture.as_ref(), Some(&event));
        }
    }
    assert_eq!(capture_frames, 1);

    assert!(controller.shutdown().await.unwrap().is_some());
}

#[tokio::test]
async fn invalid_command_is_rejected_without_side_effects() {
    let controller = start(ChannelShutter::channel().0);

    let err = controller.start_sweep().await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    assert_eq!(controller.status().phase, CapturePhase::Idle);

    let err = controller.recapture_zone(0).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn abort_returns_to_idle_without_capture() {
    let (shutter, mut shots) = ChannelShutter::channel();
    let controller = start(shutter);
    sweeping(&controller).await;

    steady_hold(&controller.feed(), 2.5, 1_000, 2_000);
    controller.wait_for_samples(2_000).await.unwrap();
    let events = controller.abort().await.unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::PhaseChanged { to: CapturePhase::Idle, .. })));

    // the rest of the hold arrives after the abort
    steady_hold(&controller.feed(), 2.5, 2_010, 3_000);
    let status = controller.wait_for_samples(3_000).await.unwrap();
    assert_eq!(status.phase, CapturePhase::Idle);
    assert!(status.session_id.is_none());
    assert!(shots.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn silent_focus_stream_reports_stall() {
    let (shutter, mut shots) = ChannelShutter::channel();
    let controller = start(shutter);
    sweeping(&controller).await;

    let feed = controller.feed();
    feed.focus(2.5, 1_000);
    controller.wait_for_samples(1_000).await.unwrap();
    assert!(!controller.status().stalled);

    // every stream goes quiet; the loop extrapolates sensor time on its own
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let status = controller.status();
    assert!(status.stalled);
    assert_eq!(status.phase, CapturePhase::AwaitingZone { zone: 0 });

    let err = controller.capture_now().await.unwrap_err();
    assert!(matches!(err, EngineError::SensorStalled { .. }));

    // a fresh focus sample clears the stall
    feed.focus(2.5, 4_000);
    let status = controller.wait_for_samples(4_000).await.unwrap();
    assert!(!status.stalled);
    assert!(shots.try_recv().is_err());
}

#[tokio::test]
async fn recorded_source_feeds_the_loop() {
    let controller = start(ChannelShutter::channel().0);
    controller.start_discovery().await.unwrap();

    let mut source = RecordedSource::new(vec![
        SensorSample::Rotation(level(0)),
        SensorSample::Focus(FocusSample::new(1.0, 10)),
        SensorSample::Focus(FocusSample::new(1.2, 20)),
    ]);
    controller.attach_focus_source(&mut source).unwrap();
    controller.wait_for_samples(20).await.unwrap();

    let err = controller.finish_discovery().await.unwrap_err();
    assert!(matches!(err, EngineError::Calibration(_)));
    controller.finish_single_zone().await.unwrap();
    assert_eq!(controller.status().occupancy, vec![false]);
}

#[tokio::test]
async fn commands_fail_after_shutdown() {
    let controller = start(ChannelShutter::channel().0);
    let machine = controller.shutdown().await.unwrap().unwrap();
    assert_eq!(machine.phase(), CapturePhase::Idle);
    assert!(controller.shutdown().await.unwrap().is_none());

    assert_eq!(
        controller.restart().await.unwrap_err(),
        EngineError::ControllerStopped
    );
}

#[tokio::test]
async fn invalid_config_is_refused() {
    let mut config = EngineConfig::default();
    config.calibration.zone_count = 0;
    let (shutter, _shots) = ChannelShutter::channel();
    let result = CaptureController::start(config, Box::new(shutter), Box::new(NullTelemetry));
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}
