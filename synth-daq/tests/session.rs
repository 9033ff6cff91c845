//! Session coordinator integration tests: start order, sensor reader
//! lifecycle, output files and teardown.

mod common;

use common::{all_proc_frame, health_frame, um7_sensor, ScriptedBackend};
use std::thread;
use std::time::Duration;
use synth_daq::acquisition::ScriptedClock;
use synth_daq::session::SessionCoordinator;
use synth_daq::synth::{BusEvent, RecordingBus};
use synth_daq::transport::MockTransport;
use synth_daq::um7::constants::HEALTH_OVF;
use synth_daq::Error;

fn wait_drained(transport: &MockTransport) {
    for _ in 0..500 {
        if transport.pending_read() == 0 {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("reader never drained the stream");
}

#[test]
fn test_run_without_sensor() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 4);
    let bus = RecordingBus::new();
    let clock = ScriptedClock::new([]);
    let mut session =
        SessionCoordinator::new(config, ScriptedBackend::with_captures(4, 2), bus.clone(), clock)
            .unwrap();

    let summary = session.run::<MockTransport>(None).unwrap();

    assert_eq!(summary.counters.flags_detected, 4);
    assert_eq!(summary.target_ramp_count, 4);
    assert!(summary.is_clean());
    assert!(summary.reader.is_none());
    assert!(summary.heartbeat.is_none());
    assert_eq!(summary.bytes_written, 4 * (64 + 8) * 2);
    assert!(dir.path().join("ch1.bin").exists());
    assert!(!dir.path().join("imu.bin").exists());

    // setup calls, then one drain per capture
    let backend = session.backend();
    assert_eq!(
        &backend.calls[..5],
        &[
            "set_decimation",
            "set_trigger_delay",
            "start_sampling",
            "set_trigger_source",
            "transfer_latest"
        ]
    );
    assert_eq!(backend.decimation, Some(8));
    assert_eq!(backend.trigger_delay, Some(-8192));
    assert_eq!(backend.transfers, 8);

    // The trigger goes out after both synthesizers are enabled; ramping is
    // disabled again at stop
    let events = bus.events();
    let trigger_at = events
        .iter()
        .position(|e| matches!(e, BusEvent::Trigger(_)))
        .unwrap();
    assert_eq!(events[trigger_at], BusEvent::Trigger(vec![1, 2]));
    assert_eq!(
        events.last(),
        Some(&BusEvent::Write {
            synth: 2,
            address: 58,
            value: 0b0010_0000
        })
    );
    assert!(events[..trigger_at].contains(&BusEvent::Write {
        synth: 1,
        address: 58,
        value: 0b0010_0001
    }));
}

#[test]
fn test_clock_waits_one_fill_before_arming() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 1);
    let clock = ScriptedClock::new([]);
    let mut session = SessionCoordinator::new(
        config,
        ScriptedBackend::with_captures(1, 0),
        RecordingBus::new(),
        clock,
    )
    .unwrap();

    session.start::<MockTransport>(None).unwrap();
    assert_eq!(session.clock().sleeps(), vec![Duration::from_micros(800)]);
    assert_eq!(session.backend().count("start_sampling"), 1);

    session.acquire().unwrap();
    session.stop().unwrap();
    // No refill wait inside the loop by default
    assert_eq!(session.clock().sleeps().len(), 1);
}

#[test]
fn test_sensor_reader_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 2);
    let sensor = um7_sensor(0);
    let handle = sensor.clone();
    let mut session = SessionCoordinator::new(
        config,
        ScriptedBackend::with_captures(2, 1),
        RecordingBus::new(),
        ScriptedClock::new([]),
    )
    .unwrap();

    session.start(Some(sensor)).unwrap();
    assert!(session.is_active());
    assert!(session.heartbeat().latest().is_some());

    // Broadcasts arriving during the capture
    handle.inject_read(&all_proc_frame(&[1.5; 12]));
    handle.inject_read(&health_frame(HEALTH_OVF));
    handle.inject_read(&all_proc_frame(&[-2.0; 12]));
    session.acquire().unwrap();
    wait_drained(&handle);

    let summary = session.stop().unwrap();
    assert!(!session.is_active());

    let reader = summary.reader.unwrap();
    assert_eq!(reader.batches, 2);
    assert_eq!(reader.bytes_written, 2 * 12 * 4);
    assert!(summary.heartbeat.unwrap().uart_overflow);

    let imu = std::fs::read(dir.path().join("imu.bin")).unwrap();
    assert_eq!(imu.len(), 96);
    assert_eq!(&imu[..4], &1.5f32.to_ne_bytes());
    assert_eq!(&imu[48..52], &(-2.0f32).to_ne_bytes());
    assert_eq!(summary.bytes_written, 96 + 2 * (64 + 8) * 2);
}

#[test]
fn test_failed_bring_up_still_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), 2);
    let silent = MockTransport::new();
    let bus = RecordingBus::new();
    let mut session = SessionCoordinator::new(
        config,
        ScriptedBackend::with_captures(2, 0),
        bus.clone(),
        ScriptedClock::new([]),
    )
    .unwrap();

    match session.run(Some(silent)) {
        Err(Error::NoResponse { attempts, .. }) => assert_eq!(attempts, 100),
        other => panic!("unexpected result: {:?}", other.map(|s| s.counters)),
    }

    assert!(!session.is_active());
    assert_eq!(session.counters().flags_detected, 0);
    assert_eq!(session.backend().transfers, 0);
    // Never triggered, but ramping is switched off on the way out
    assert!(!bus.events().iter().any(|e| matches!(e, BusEvent::Trigger(_))));
    assert!(bus.writes_to(1).contains(&(58, 0b0010_0000)));
}

#[test]
fn test_unwritable_storage_is_attributed() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let config = common::test_config(&blocker.join("run"), 1);
    let mut session = SessionCoordinator::new(
        config,
        ScriptedBackend::with_captures(1, 0),
        RecordingBus::new(),
        ScriptedClock::new([]),
    )
    .unwrap();

    match session.run::<MockTransport>(None) {
        Err(Error::Output { path, .. }) => assert_eq!(path, blocker.join("run")),
        other => panic!("unexpected result: {:?}", other.map(|s| s.counters)),
    }
}
