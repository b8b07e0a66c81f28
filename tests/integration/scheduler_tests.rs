//! Scheduler behaviour driven end-to-end through the run loop.

use pmlogger::app::events::{AppEvent, Mode};
use pmlogger::app::ports::PeerHandle;
use pmlogger::error::{Error, SensorError};
use pmlogger::radio_event::{LeSubevent, RadioEvent, StackState};
use pmlogger::run_loop::RunLoop;
use pmlogger::timers::TimerId;

use crate::mock_hw::{MemoryStorage, RadioCall, march_first, rig};

const SYNC_WAIT: u64 = 30_000;
const LOG_INTERVAL: u64 = 15 * 60_000;
const LIVE_INTERVAL: u64 = 5_000;

fn ready() -> RadioEvent {
    RadioEvent::StackState(StackState::Working)
}

fn connected(handle: u16) -> RadioEvent {
    RadioEvent::LeMeta(LeSubevent::ConnectionComplete { status: 0, handle })
}

fn disconnected(handle: u16) -> RadioEvent {
    RadioEvent::DisconnectionComplete {
        handle,
        reason: 0x13,
    }
}

// ── Startup failures ──────────────────────────────────────────

#[test]
fn sensor_init_failure_is_reported_and_absorbed() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    s.sensor_mut().bus_mut().fail = true;
    let err = s.init_sensor(&mut sink).unwrap_err();
    assert_eq!(err, Error::SensorInit(SensorError::Bus));
    assert_eq!(sink.0, vec![AppEvent::SensorFault(err)]);
    assert_eq!(s.next_deadline(), None);
}

#[test]
fn unmountable_storage_reports_mount_error() {
    let (mut s, _sink) = rig(MemoryStorage::unmountable(), march_first());
    assert_eq!(s.mount_storage(), Err(Error::StorageMount));
    assert!(!s.storage().mounted);
}

#[test]
fn disconnection_before_ready_waits_for_stack() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(connected(1));
    rl.post(disconnected(1));
    rl.poll(&mut s, 0, &mut sink);

    assert_eq!(s.mode(), Mode::AwaitingSync);
    assert!(!s.radio().advertising());
    assert!(!s.timers().is_armed(TimerId::Cycle));

    rl.post(ready());
    rl.poll(&mut s, 10, &mut sink);
    assert!(s.radio().advertising());
    assert_eq!(s.next_deadline(), Some(10 + SYNC_WAIT));
}

// ── Sync wait ─────────────────────────────────────────────────

#[test]
fn unsynced_device_only_readvertises() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    assert!(rl.post(ready()));
    assert_eq!(rl.poll(&mut s, 0, &mut sink), 1);
    assert_eq!(s.mode(), Mode::AwaitingSync);

    for n in 1..=5u64 {
        let now = n * SYNC_WAIT;
        assert_eq!(rl.idle_budget(&s, now - 1, u64::MAX), 1);
        assert_eq!(rl.poll(&mut s, now, &mut sink), 1);
        assert_eq!(s.next_deadline(), Some(now + SYNC_WAIT));
    }

    assert_eq!(s.storage().line_count(), 0);
    assert_eq!(sink.logged(), 0);
    assert_eq!(s.mode(), Mode::AwaitingSync);
    assert!(s.radio().advertising());
    assert_eq!(s.radio().count(&RadioCall::StopAdvertising), 5);
    assert_eq!(s.radio().count(&RadioCall::StartAdvertising), 6);
}

#[test]
fn sync_between_cycles_logs_once_with_current_reading() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.poll(&mut s, 0, &mut sink);
    rl.poll(&mut s, SYNC_WAIT, &mut sink);
    assert_eq!(s.storage().line_count(), 0);

    s.radio_mut().synced = true;
    s.sensor_mut().bus_mut().set_reading(7, 8, 9);
    assert_eq!(rl.poll(&mut s, 2 * SYNC_WAIT, &mut sink), 1);

    assert_eq!(sink.logged(), 1);
    assert_eq!(
        s.storage().files.get("2025-03-01.txt").map(String::as_str),
        Some("2025-03-01T10:15:30,PM1_0:7,PM2_5:8,PM10:9\n")
    );
    assert_eq!(s.mode(), Mode::Serving);
    assert_eq!(s.next_deadline(), Some(2 * SYNC_WAIT + LOG_INTERVAL));
    assert!(sink.0.contains(&AppEvent::ModeChanged {
        from: Mode::AwaitingSync,
        to: Mode::Serving,
    }));
}

#[test]
fn round_trip_line_lands_in_daily_file() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    s.radio_mut().synced = true;
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.poll(&mut s, 0, &mut sink);
    assert_eq!(s.next_deadline(), Some(LOG_INTERVAL));
    rl.poll(&mut s, LOG_INTERVAL, &mut sink);

    assert_eq!(s.storage().files.len(), 1);
    assert_eq!(
        s.storage().files["2025-03-01.txt"],
        "2025-03-01T10:15:30,PM1_0:12,PM2_5:34,PM10:56\n"
    );
}

#[test]
fn timer_fires_once_per_deadline() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.poll(&mut s, 0, &mut sink);
    assert_eq!(rl.poll(&mut s, SYNC_WAIT, &mut sink), 1);
    assert_eq!(rl.poll(&mut s, SYNC_WAIT, &mut sink), 0);
    assert_eq!(s.radio().count(&RadioCall::StopAdvertising), 1);
}

#[test]
fn sensor_fault_during_cycle_logs_nothing() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    s.radio_mut().synced = true;
    s.sensor_mut().bus_mut().fail = true;
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.poll(&mut s, 0, &mut sink);
    rl.poll(&mut s, LOG_INTERVAL, &mut sink);

    assert_eq!(s.storage().line_count(), 0);
    assert!(
        sink.0
            .contains(&AppEvent::SensorFault(Error::SensorRead(SensorError::Bus)))
    );
    assert_eq!(s.next_deadline(), Some(2 * LOG_INTERVAL));
}

// ── Live connection ───────────────────────────────────────────

#[test]
fn connection_cancels_cycle_and_streams_pm25() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.poll(&mut s, 0, &mut sink);

    rl.post(connected(0x41));
    rl.poll(&mut s, 10_000, &mut sink);
    assert_eq!(s.mode(), Mode::LiveConnected);
    assert!(!s.timers().is_armed(TimerId::Cycle));
    assert_eq!(s.next_deadline(), Some(10_001));

    assert_eq!(rl.poll(&mut s, 10_001, &mut sink), 1);
    assert_eq!(s.next_deadline(), Some(10_001 + LIVE_INTERVAL));
    rl.poll(&mut s, 10_001 + LIVE_INTERVAL, &mut sink);
    rl.poll(&mut s, 10_001 + 2 * LIVE_INTERVAL, &mut sink);

    assert_eq!(s.radio().notified(), vec![34, 34, 34]);
    assert!(!s.timers().is_armed(TimerId::Cycle));
    assert_eq!(s.radio().count(&RadioCall::StopAdvertising), 0);
    assert_eq!(s.storage().line_count(), 0);
}

#[test]
fn disconnection_returns_to_sync_wait() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.post(connected(0x41));
    rl.poll(&mut s, 0, &mut sink);
    rl.poll(&mut s, 1, &mut sink);

    rl.post(disconnected(0x41));
    rl.poll(&mut s, 3_000, &mut sink);

    assert_eq!(s.mode(), Mode::AwaitingSync);
    assert!(!s.timers().is_armed(TimerId::LiveUpdate));
    assert_eq!(s.next_deadline(), Some(3_000 + SYNC_WAIT));
    assert!(s.radio().advertising());
    let last_peer = s
        .radio()
        .calls
        .iter()
        .rev()
        .find(|c| matches!(c, RadioCall::SetPeer(_)));
    assert_eq!(last_peer, Some(&RadioCall::SetPeer(None)));
    assert!(sink.0.contains(&AppEvent::PeerDisconnected(PeerHandle::new(0x41))));
}

#[test]
fn stale_disconnection_is_ignored() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.post(connected(0x41));
    rl.poll(&mut s, 0, &mut sink);
    let events_before = sink.0.len();
    let calls_before = s.radio().calls.len();
    let live_before = s.timers().get(TimerId::LiveUpdate);

    rl.post(disconnected(0x42));
    assert_eq!(rl.poll(&mut s, 0, &mut sink), 1);

    assert_eq!(s.mode(), Mode::LiveConnected);
    assert_eq!(s.connection().peer(), Some(PeerHandle::new(0x41)));
    assert_eq!(s.timers().get(TimerId::LiveUpdate), live_before);
    assert_eq!(sink.0.len(), events_before);
    assert_eq!(s.radio().calls.len(), calls_before);
}

#[test]
fn live_sample_fault_keeps_streaming() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.post(connected(0x41));
    rl.poll(&mut s, 0, &mut sink);

    s.sensor_mut().bus_mut().fail = true;
    rl.poll(&mut s, 1, &mut sink);
    assert!(s.radio().notified().is_empty());
    assert_eq!(s.next_deadline(), Some(1 + LIVE_INTERVAL));

    s.sensor_mut().bus_mut().fail = false;
    rl.poll(&mut s, 1 + LIVE_INTERVAL, &mut sink);
    assert_eq!(s.radio().notified(), vec![34]);
}

#[test]
fn confirmed_sync_survives_a_connection() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    s.radio_mut().synced = true;
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(ready());
    rl.post(connected(0x41));
    rl.poll(&mut s, 0, &mut sink);

    s.radio_mut().synced = false;
    rl.post(disconnected(0x41));
    rl.poll(&mut s, 2_000, &mut sink);

    assert_eq!(s.mode(), Mode::Serving);
    assert_eq!(s.next_deadline(), Some(2_000 + LOG_INTERVAL));
}

// ── Heartbeat ─────────────────────────────────────────────────

#[test]
fn heartbeat_blinks_faster_while_connected() {
    let (mut s, mut sink) = rig(MemoryStorage::mounted(), march_first());
    let mut rl: RunLoop<8> = RunLoop::new();
    rl.post(connected(0x41));
    rl.poll(&mut s, 0, &mut sink);
    s.arm_heartbeat(0);

    let mut now = 1_000;
    let mut gaps = Vec::new();
    for _ in 0..4 {
        rl.poll(&mut s, now, &mut sink);
        let next = s.timers().get(TimerId::Heartbeat).unwrap().deadline_ms;
        gaps.push(next - now);
        now = next;
    }
    assert_eq!(gaps, vec![100, 100, 100, 1_000]);
    let leds: Vec<_> = s
        .radio()
        .calls
        .iter()
        .filter(|c| matches!(c, RadioCall::Led(_)))
        .cloned()
        .collect();
    assert_eq!(
        leds,
        vec![
            RadioCall::Led(true),
            RadioCall::Led(false),
            RadioCall::Led(true),
            RadioCall::Led(false),
        ]
    );
}
