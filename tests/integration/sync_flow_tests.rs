//! Host simulation of the firmware loop: simulated BLE radio, synced
//! clock and a directory-backed SD store wired into one scheduler.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use pmlogger::adapters::ble::{BleRadio, BleState};
use pmlogger::adapters::log_sink::LogEventSink;
use pmlogger::adapters::sd_card::{HostDir, SdCardStore};
use pmlogger::adapters::time::{SyncedClock, Uptime};
use pmlogger::app::events::Mode;
use pmlogger::app::ports::{PeerHandle, RadioPort};
use pmlogger::app::service::Scheduler;
use pmlogger::config::LoggerConfig;
use pmlogger::radio_event::{LeSubevent, RadioEvent, StackState};
use pmlogger::run_loop::RunLoop;
use pmlogger::sensors::Hm3301;

use crate::mock_hw::MockBus;

/// 2025-03-01T10:15:30Z
const SYNC_SECS: u32 = 1_740_824_130;

#[derive(Clone, Default)]
struct SimUptime(Rc<Cell<u64>>);

impl Uptime for SimUptime {
    fn uptime_ms(&self) -> u64 {
        self.0.get()
    }
}

type SimScheduler =
    Scheduler<Hm3301<MockBus>, BleRadio, SdCardStore<HostDir>, SyncedClock<SimUptime>>;

struct Sim {
    sched: SimScheduler,
    run_loop: RunLoop,
    sink: LogEventSink,
    uptime: SimUptime,
    dir: PathBuf,
}

impl Sim {
    fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("pmlogger-sim-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let uptime = SimUptime::default();
        let config = LoggerConfig::default();
        let mut sink = LogEventSink::new();
        let mut sched = Scheduler::new(
            &config,
            Hm3301::new(MockBus::with_reading(12, 34, 56)),
            BleRadio::new(config.device_name.clone()),
            SdCardStore::new(&dir, HostDir),
            SyncedClock::new(uptime.clone()),
        )
        .unwrap();
        sched.init_sensor(&mut sink).unwrap();
        sched.mount_storage().unwrap();
        Self {
            sched,
            run_loop: RunLoop::new(),
            sink,
            uptime,
            dir,
        }
    }

    /// One pass of the firmware loop at `now_ms`.
    fn step(&mut self, now_ms: u64) {
        self.uptime.0.set(now_ms);
        self.sched.radio_mut().forward_events(&mut self.run_loop);
        if let Some(raw) = self.sched.radio_mut().take_time_write() {
            if self.sched.clock_mut().apply_sync_payload(&raw).is_ok() {
                self.sched.radio_mut().confirm_time_sync();
            }
        }
        self.run_loop.poll(&mut self.sched, now_ms, &mut self.sink);
    }

    fn push(&mut self, event: RadioEvent) {
        assert!(self.sched.radio_mut().sim_push_event(event));
    }

    fn day_file(&self, day: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.join(format!("{day}.txt"))).ok()
    }
}

impl Drop for Sim {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn time_write_enables_logging() {
    let mut sim = Sim::new("sync");
    sim.push(RadioEvent::StackState(StackState::Working));
    sim.step(0);
    assert_eq!(sim.sched.radio().state(), BleState::Advertising);
    assert_eq!(sim.sched.mode(), Mode::AwaitingSync);

    sim.push(RadioEvent::LeMeta(LeSubevent::ConnectionComplete {
        status: 0,
        handle: 3,
    }));
    sim.step(5_000);
    assert_eq!(sim.sched.radio().peer(), Some(PeerHandle::new(3)));

    sim.sched.radio_mut().sim_write_time(&SYNC_SECS.to_le_bytes());
    sim.step(5_001);
    assert_eq!(sim.sched.radio().last_pm25(), Some(34));

    sim.push(RadioEvent::DisconnectionComplete {
        handle: 3,
        reason: 0x13,
    });
    sim.step(6_000);
    assert_eq!(sim.sched.mode(), Mode::Serving);
    assert_eq!(sim.sched.radio().state(), BleState::Advertising);

    // One log interval later the clock has advanced by 15 minutes.
    sim.step(6_000 + 15 * 60_000);
    assert_eq!(
        sim.day_file("2025-03-01").as_deref(),
        Some("2025-03-01T10:30:30,PM1_0:12,PM2_5:34,PM10:56\n")
    );
    assert_eq!(sim.sink.records(), 1);
}

#[test]
fn rejected_time_write_keeps_waiting() {
    let mut sim = Sim::new("reject");
    sim.push(RadioEvent::StackState(StackState::Working));
    sim.step(0);

    sim.sched.radio_mut().sim_write_time(&[1, 2, 3]);
    sim.step(10);
    assert!(!sim.sched.radio().is_time_synchronized());

    sim.step(30_000);
    assert_eq!(sim.sched.mode(), Mode::AwaitingSync);
    assert!(sim.day_file("2025-03-01").is_none());
    assert_eq!(sim.sink.records(), 0);
}
