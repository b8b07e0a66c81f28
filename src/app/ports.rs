//! Port traits: the hexagonal boundary between the scheduler and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Scheduler (domain)
//! ```
//!
//! Driven adapters (radio, sensor, storage, clock, event sink) implement
//! these traits.  The [`Scheduler`](super::service::Scheduler) owns one
//! value of each, so the core never touches hardware directly and every
//! handler is testable with mocks.
//!
//! Every call here is synchronous and runs on the single event-loop
//! thread.  A slow sensor or SD card stalls the radio for the duration
//! of the call.

use crate::calendar::CalendarTime;
use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Values crossing the boundary
// ───────────────────────────────────────────────────────────────

/// Opaque link identifier assigned by the radio stack.
///
/// Link handles are 12 bits wide; the upper nibble of the 16-bit field
/// carries packet-boundary flags and is masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerHandle(u16);

impl PeerHandle {
    pub const MASK: u16 = 0x0FFF;

    pub const fn new(raw: u16) -> Self {
        Self(raw & Self::MASK)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl core::fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:03x}", self.0)
    }
}

/// One particulate sample (standard particulate, CF=1, µg/m³).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reading {
    pub pm1_0: u16,
    pub pm2_5: u16,
    pub pm10: u16,
}

/// Sensor bus wiring handed to [`SensorPort::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub address: u8,
    pub sda_gpio: u8,
    pub scl_gpio: u8,
}

impl From<&crate::config::LoggerConfig> for BusConfig {
    fn from(cfg: &crate::config::LoggerConfig) -> Self {
        Self {
            address: cfg.sensor_i2c_address,
            sda_gpio: cfg.sensor_sda_gpio,
            scl_gpio: cfg.sensor_scl_gpio,
        }
    }
}

/// Length of one raw sensor frame.
pub const RAW_FRAME_LEN: usize = 29;

/// Raw sensor frame buffer.
pub type RawFrame = [u8; RAW_FRAME_LEN];

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ BLE stack)
// ───────────────────────────────────────────────────────────────

/// Radio link / pairing collaborator.
///
/// The raw event feed (ready, connection, disconnection) does not go
/// through this trait: adapters post it into the
/// [`RunLoop`](crate::run_loop::RunLoop) queue instead.
pub trait RadioPort {
    /// Whether the peer has written wall-clock time since boot.
    fn is_time_synchronized(&self) -> bool;

    /// Tell the GATT layer which link notifications go to.
    fn set_peer(&mut self, peer: Option<PeerHandle>);

    /// Begin connectable advertising.  Idempotent.
    fn start_advertising(&mut self);

    /// Stop advertising.  Idempotent.
    fn stop_advertising(&mut self);

    /// Push the live PM2.5 value to the connected peer.
    fn notify_pm25(&mut self, value: u16);

    /// Drive the status LED (wired to the radio module on the reference board).
    fn set_status_led(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait SensorPort {
    /// Put the sensor into the mode the driver expects.
    fn initialize(&mut self, bus: &BusConfig) -> Result<(), SensorError>;

    /// Read one raw frame into `frame`.
    fn read_raw(&mut self, frame: &mut RawFrame) -> Result<(), SensorError>;

    /// Decode a frame previously filled by [`read_raw`](Self::read_raw).
    fn parse(frame: &RawFrame) -> Reading;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain → removable media)
// ───────────────────────────────────────────────────────────────

/// Append-only persistence for log records.
pub trait StoragePort {
    /// Mount the medium.  Returns `true` on success.
    fn mount(&mut self) -> bool;

    fn is_mounted(&self) -> bool;

    /// Append `line` to the file for `partition` (`<partition>.txt`),
    /// creating it if needed.  Never truncates.
    fn append(&mut self, partition: &str, line: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Calendar clock (driven adapter: time-sync collaborator)
// ───────────────────────────────────────────────────────────────

pub trait CalendarClock {
    fn now_calendar(&self) -> Result<CalendarTime, ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from loading the configuration override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No override file present.
    NotFound,
    /// File present but not valid JSON for [`LoggerConfig`](crate::config::LoggerConfig).
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The medium is not mounted.
    NotMounted,
    /// The partition file could not be opened or created.
    Open,
    /// Writing the line failed or was short.
    Write,
    /// Flushing/closing the file failed.
    Close,
    /// Partition name does not fit the 8.3-style file name buffer.
    NameTooLong,
}

/// Errors from [`CalendarClock::now_calendar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The clock has never been set.
    NotSet,
    /// The underlying timer could not be read.
    Unavailable,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotMounted => write!(f, "not mounted"),
            Self::Open => write!(f, "open failed"),
            Self::Write => write!(f, "write failed"),
            Self::Close => write!(f, "close failed"),
            Self::NameTooLong => write!(f, "file name too long"),
        }
    }
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotSet => write!(f, "clock not set"),
            Self::Unavailable => write!(f, "clock unavailable"),
        }
    }
}
