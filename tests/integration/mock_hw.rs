//! Mock hardware for integration tests.
//!
//! Records every radio call so tests can assert on the full command
//! history, and keeps log files in memory instead of on a FAT volume.
//! The sensor side uses the real HM3301 driver over a scripted I2C bus.

use std::collections::BTreeMap;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};

use pmlogger::app::events::AppEvent;
use pmlogger::app::ports::{
    CalendarClock, ClockError, EventSink, PeerHandle, RAW_FRAME_LEN, RadioPort, RawFrame,
    StorageError, StoragePort,
};
use pmlogger::app::service::Scheduler;
use pmlogger::calendar::CalendarTime;
use pmlogger::config::LoggerConfig;
use pmlogger::sensors::Hm3301;
use pmlogger::sensors::hm3301::frame_checksum;

// ── Radio call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    SetPeer(Option<PeerHandle>),
    StartAdvertising,
    StopAdvertising,
    Notify(u16),
    Led(bool),
}

// ── MockRadio ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRadio {
    pub synced: bool,
    pub calls: Vec<RadioCall>,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn advertising(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                RadioCall::StartAdvertising => Some(true),
                RadioCall::StopAdvertising => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn notified(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Notify(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &RadioCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl RadioPort for MockRadio {
    fn is_time_synchronized(&self) -> bool {
        self.synced
    }

    fn set_peer(&mut self, peer: Option<PeerHandle>) {
        self.calls.push(RadioCall::SetPeer(peer));
    }

    fn start_advertising(&mut self) {
        self.calls.push(RadioCall::StartAdvertising);
    }

    fn stop_advertising(&mut self) {
        self.calls.push(RadioCall::StopAdvertising);
    }

    fn notify_pm25(&mut self, value: u16) {
        self.calls.push(RadioCall::Notify(value));
    }

    fn set_status_led(&mut self, on: bool) {
        self.calls.push(RadioCall::Led(on));
    }
}

// ── MockBus (HM3301 behind it) ────────────────────────────────

pub struct MockBus {
    pub frame: RawFrame,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockBus {
    pub fn with_reading(pm1: u16, pm25: u16, pm10: u16) -> Self {
        let mut bus = Self {
            frame: [0; RAW_FRAME_LEN],
            fail: false,
        };
        bus.set_reading(pm1, pm25, pm10);
        bus
    }

    pub fn set_reading(&mut self, pm1: u16, pm25: u16, pm10: u16) {
        let mut f = [0u8; RAW_FRAME_LEN];
        f[2..4].copy_from_slice(&1u16.to_be_bytes());
        f[4..6].copy_from_slice(&pm1.to_be_bytes());
        f[6..8].copy_from_slice(&pm25.to_be_bytes());
        f[8..10].copy_from_slice(&pm10.to_be_bytes());
        f[RAW_FRAME_LEN - 1] = frame_checksum(&f);
        self.frame = f;
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for MockBus {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        for op in operations {
            if let Operation::Read(buf) = op {
                let n = buf.len().min(self.frame.len());
                buf[..n].copy_from_slice(&self.frame[..n]);
            }
        }
        Ok(())
    }
}

// ── MemoryStorage ─────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStorage {
    pub mountable: bool,
    pub mounted: bool,
    pub files: BTreeMap<String, String>,
}

#[allow(dead_code)]
impl MemoryStorage {
    pub fn mounted() -> Self {
        Self {
            mountable: true,
            mounted: true,
            files: BTreeMap::new(),
        }
    }

    pub fn unmountable() -> Self {
        Self::default()
    }

    pub fn line_count(&self) -> usize {
        self.files.values().map(|f| f.lines().count()).sum()
    }
}

impl StoragePort for MemoryStorage {
    fn mount(&mut self) -> bool {
        self.mounted |= self.mountable;
        self.mounted
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn append(&mut self, partition: &str, line: &str) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        self.files
            .entry(format!("{partition}.txt"))
            .or_default()
            .push_str(line);
        Ok(())
    }
}

// ── FixedClock ────────────────────────────────────────────────

pub struct FixedClock(pub Option<CalendarTime>);

#[allow(dead_code)]
impl FixedClock {
    pub fn at(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self(Some(CalendarTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }))
    }

    pub fn unset() -> Self {
        Self(None)
    }
}

impl CalendarClock for FixedClock {
    fn now_calendar(&self) -> Result<CalendarTime, ClockError> {
        self.0.ok_or(ClockError::NotSet)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink(pub Vec<AppEvent>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn logged(&self) -> usize {
        self.0
            .iter()
            .filter(|e| matches!(e, AppEvent::RecordLogged { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type Rig = Scheduler<Hm3301<MockBus>, MockRadio, MemoryStorage, FixedClock>;

/// Scheduler over mocks with default timing, sensor already in I2C mode.
#[allow(dead_code)]
pub fn rig(storage: MemoryStorage, clock: FixedClock) -> (Rig, RecordingSink) {
    let mut sink = RecordingSink::default();
    let mut sched = Scheduler::new(
        &LoggerConfig::default(),
        Hm3301::new(MockBus::with_reading(12, 34, 56)),
        MockRadio::default(),
        storage,
        clock,
    )
    .unwrap();
    sched.init_sensor(&mut sink).unwrap();
    (sched, sink)
}

/// The clock every "happy path" test uses.
#[allow(dead_code)]
pub fn march_first() -> FixedClock {
    FixedClock::at(2025, 3, 1, 10, 15, 30)
}
