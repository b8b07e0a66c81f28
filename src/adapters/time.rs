//! ESP32 time adapters.
//!
//! [`MonotonicClock`] gives milliseconds since boot for the run loop.
//! [`SyncedClock`] turns a peer-supplied Unix timestamp plus elapsed
//! monotonic time into calendar time for the logging gate.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use core::fmt;

use log::info;

use crate::app::ports::{CalendarClock, ClockError};
use crate::calendar::{CalendarTime, FAT_EPOCH_UNIX_SECS};

/// Time-sync payload length: `u32` little-endian Unix seconds.
pub const SYNC_PAYLOAD_LEN: usize = 4;

// ───────────────────────────────────────────────────────────────
// Monotonic source
// ───────────────────────────────────────────────────────────────

/// Milliseconds since an arbitrary fixed origin.  Never goes backwards.
pub trait Uptime {
    fn uptime_ms(&self) -> u64;
}

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Uptime for MonotonicClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1000
    }
}

// ───────────────────────────────────────────────────────────────
// Time-sync payload
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncError {
    /// Payload was not exactly four bytes.
    BadLength(usize),
    /// Timestamp predates 1980-01-01.
    BeforeFatEpoch(u64),
}

impl fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(n) => write!(f, "expected {} bytes, got {}", SYNC_PAYLOAD_LEN, n),
            Self::BeforeFatEpoch(s) => write!(f, "timestamp {} is before 1980", s),
        }
    }
}

/// Decode a time-sync write into Unix seconds.
pub fn parse_sync_payload(raw: &[u8]) -> Result<u64, TimeSyncError> {
    let bytes: [u8; SYNC_PAYLOAD_LEN] = raw
        .try_into()
        .map_err(|_| TimeSyncError::BadLength(raw.len()))?;
    let secs = u64::from(u32::from_le_bytes(bytes));
    if secs < FAT_EPOCH_UNIX_SECS {
        return Err(TimeSyncError::BeforeFatEpoch(secs));
    }
    Ok(secs)
}

// ───────────────────────────────────────────────────────────────
// Synced calendar clock
// ───────────────────────────────────────────────────────────────

/// Wall clock anchored by the last accepted time sync.
pub struct SyncedClock<T> {
    uptime: T,
    /// (Unix seconds, uptime ms) at the last sync.
    anchor: Option<(u64, u64)>,
}

impl<T: Uptime> SyncedClock<T> {
    pub fn new(uptime: T) -> Self {
        Self {
            uptime,
            anchor: None,
        }
    }

    /// Anchor the clock at `unix_secs`, as of now.
    pub fn set(&mut self, unix_secs: u64) {
        self.anchor = Some((unix_secs, self.uptime.uptime_ms()));
        info!(
            "Clock set to {}",
            CalendarTime::from_unix_secs(unix_secs)
        );
    }

    /// Validate and apply a raw time-sync write.
    pub fn apply_sync_payload(&mut self, raw: &[u8]) -> Result<u64, TimeSyncError> {
        let secs = parse_sync_payload(raw)?;
        self.set(secs);
        Ok(secs)
    }

    pub fn is_set(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn unix_secs(&self) -> Option<u64> {
        self.anchor.map(|(secs, at_ms)| {
            let elapsed_ms = self.uptime.uptime_ms().saturating_sub(at_ms);
            secs + elapsed_ms / 1000
        })
    }

    pub fn uptime(&self) -> &T {
        &self.uptime
    }
}

impl<T: Uptime> CalendarClock for SyncedClock<T> {
    fn now_calendar(&self) -> Result<CalendarTime, ClockError> {
        self.unix_secs()
            .map(CalendarTime::from_unix_secs)
            .ok_or(ClockError::NotSet)
    }
}
