//! Unified error types for the datalogger firmware.
//!
//! A single `Error` enum that every subsystem can convert into.  Only
//! [`Error::RadioInit`] and [`Error::Config`] abort startup; everything
//! else is absorbed where it happens and reported through the event sink.
//! All variants are `Copy`.

use core::fmt;

use crate::app::gate::LogSkip;
use crate::app::ports::{ClockError, ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Radio bring-up failed.  Aborts startup.
    RadioInit(RadioError),
    /// The active configuration does not validate.  Aborts startup.
    Config(ConfigError),
    /// Sensor bus initialisation failed.  Reads keep failing afterwards.
    SensorInit(SensorError),
    /// A single acquisition failed.
    SensorRead(SensorError),
    /// The SD card is not mounted.  Logging is off for this boot.
    StorageMount,
    /// The clock is not synchronized or reports an implausible year.
    UnsynchronizedClock,
    /// Calendar time could not be read.
    Clock(ClockError),
    /// The record did not fit its line buffer.
    RecordFormat,
    /// A record could not be written.
    StorageWrite(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RadioInit(e) => write!(f, "radio init: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::SensorInit(e) => write!(f, "sensor init: {e}"),
            Self::SensorRead(e) => write!(f, "sensor read: {e}"),
            Self::StorageMount => write!(f, "storage not mounted"),
            Self::UnsynchronizedClock => write!(f, "clock not synchronized"),
            Self::Clock(e) => write!(f, "clock: {e}"),
            Self::RecordFormat => write!(f, "record formatting overflow"),
            Self::StorageWrite(e) => write!(f, "storage write: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::RadioInit(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::StorageWrite(e)
    }
}

impl From<ClockError> for Error {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

/// Fold a logging-gate skip into its error kind.
impl From<LogSkip> for Error {
    fn from(skip: LogSkip) -> Self {
        match skip {
            LogSkip::NotMounted => Self::StorageMount,
            LogSkip::Unsynchronized | LogSkip::ImplausibleYear(_) => Self::UnsynchronizedClock,
            LogSkip::ClockUnavailable(e) => e.into(),
            LogSkip::Format => Self::RecordFormat,
            LogSkip::Write(e) => e.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction failed (NACK, arbitration loss, bus fault).
    Bus,
    /// `initialize` never succeeded, so the sensor is not in I2C mode.
    NotInitialized,
    /// Frame checksum did not match.
    Checksum,
    /// Sensor returned an all-zero frame (fan still spinning up).
    NoData,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::NotInitialized => write!(f, "sensor not initialized"),
            Self::Checksum => write!(f, "frame checksum mismatch"),
            Self::NoData => write!(f, "empty frame"),
        }
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Controller init/enable failed (carries the platform error code).
    Controller(i32),
    /// Host stack init/enable failed.
    HostStack(i32),
    /// GATT application registration failed.
    GattRegistration(i32),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller(code) => write!(f, "controller bring-up failed ({code})"),
            Self::HostStack(code) => write!(f, "host stack bring-up failed ({code})"),
            Self::GattRegistration(code) => write!(f, "GATT registration failed ({code})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
