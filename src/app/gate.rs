//! Logging gate.
//!
//! Decides, for every scheduled acquisition, whether the sample may be
//! persisted, and if so where.  Checks run in a fixed order and the
//! first failure wins:
//!
//! ```text
//!  mounted? ─▶ sync confirmed? ─▶ calendar time? ─▶ year >= 1980? ─▶ append
//!     │              │                  │                 │            │
//!  NotMounted   Unsynchronized   ClockUnavailable  ImplausibleYear   Write
//! ```
//!
//! Nothing here panics or propagates: the caller turns a [`LogSkip`] into
//! a diagnostic and carries on.

use core::fmt::{self, Write as _};

use heapless::String;

use super::ports::{CalendarClock, ClockError, Reading, StorageError, StoragePort};
use crate::calendar::CalendarTime;

/// `YYYY-MM-DDTHH:MM:SS`
pub const TIMESTAMP_LEN: usize = 19;
/// `YYYY-MM-DD`
pub const PARTITION_LEN: usize = 10;
/// Longest possible persisted line, newline included.
pub const LINE_CAP: usize = 64;

/// Why a log cycle persisted nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSkip {
    /// Storage never mounted this boot.
    NotMounted,
    /// No time sync received from a peer yet.
    Unsynchronized,
    /// The calendar clock could not be read.
    ClockUnavailable(ClockError),
    /// Clock returned a year the storage timestamps cannot represent.
    ImplausibleYear(i32),
    /// Timestamp or line did not fit its buffer.
    Format,
    /// The storage backend rejected the append.
    Write(StorageError),
}

impl fmt::Display for LogSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted => write!(f, "storage not mounted"),
            Self::Unsynchronized => write!(f, "time not synchronized"),
            Self::ClockUnavailable(e) => write!(f, "calendar time unavailable: {}", e),
            Self::ImplausibleYear(y) => write!(f, "implausible year {}", y),
            Self::Format => write!(f, "record formatting overflow"),
            Self::Write(e) => write!(f, "append failed: {}", e),
        }
    }
}

/// One persisted sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String<TIMESTAMP_LEN>,
    pub reading: Reading,
    pub partition: String<PARTITION_LEN>,
}

impl LogRecord {
    pub fn new(time: &CalendarTime, reading: Reading) -> Result<Self, LogSkip> {
        let mut timestamp = String::new();
        write!(timestamp, "{}", time).map_err(|_| LogSkip::Format)?;
        let mut partition = String::new();
        write!(partition, "{}", time.date()).map_err(|_| LogSkip::Format)?;
        Ok(Self {
            timestamp,
            reading,
            partition,
        })
    }

    /// `YYYY-MM-DDTHH:MM:SS,PM1_0:<u16>,PM2_5:<u16>,PM10:<u16>\n`
    pub fn csv_line(&self) -> Result<String<LINE_CAP>, LogSkip> {
        let mut line = String::new();
        writeln!(
            line,
            "{},PM1_0:{},PM2_5:{},PM10:{}",
            self.timestamp, self.reading.pm1_0, self.reading.pm2_5, self.reading.pm10
        )
        .map_err(|_| LogSkip::Format)?;
        Ok(line)
    }
}

/// Run the gate for one reading.  Returns the record that was appended.
pub fn try_log<P, C>(
    storage: &mut P,
    clock: &C,
    sync_confirmed: bool,
    reading: Reading,
) -> Result<LogRecord, LogSkip>
where
    P: StoragePort,
    C: CalendarClock,
{
    if !storage.is_mounted() {
        return Err(LogSkip::NotMounted);
    }
    if !sync_confirmed {
        return Err(LogSkip::Unsynchronized);
    }
    let now = clock.now_calendar().map_err(LogSkip::ClockUnavailable)?;
    if !now.is_plausible() {
        return Err(LogSkip::ImplausibleYear(now.year));
    }

    let record = LogRecord::new(&now, reading)?;
    let line = record.csv_line()?;
    storage
        .append(&record.partition, &line)
        .map_err(LogSkip::Write)?;
    Ok(record)
}
