//! System configuration parameters
//!
//! All tunable parameters for the datalogger.  Defaults match the
//! shipping hardware; a `logger.json` file in the SD card root may
//! override any subset of them (see [`LoggerConfig::from_json`]).

use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins;
use crate::timers::MIN_DELAY;

/// Longest BLE device name that fits the advertising payload.
pub const MAX_DEVICE_NAME_LEN: usize = 24;

/// Highest GPIO number on the ESP32-S3.
pub const MAX_GPIO: u8 = 48;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    // --- Scheduling ---
    /// Cycle deadline while waiting for the first time sync (milliseconds)
    pub sync_wait_timeout_ms: u32,
    /// Cycle deadline between persisted samples once synced (milliseconds)
    pub log_interval_ms: u32,
    /// Live telemetry push period while a peer is connected (milliseconds)
    pub live_update_interval_ms: u32,
    /// Delay before the first live push after a connection (milliseconds)
    pub live_bootstrap_delay_ms: u32,

    // --- Heartbeat LED ---
    /// LED half-period when idle (milliseconds)
    pub heartbeat_slow_ms: u32,
    /// LED half-period for the quick blink (milliseconds)
    pub heartbeat_fast_ms: u32,

    // --- Sensor bus ---
    /// HM3301 7-bit I2C address
    pub sensor_i2c_address: u8,
    /// I2C SDA pin
    pub sensor_sda_gpio: u8,
    /// I2C SCL pin
    pub sensor_scl_gpio: u8,

    // --- Radio ---
    /// Advertised BLE device name
    pub device_name: heapless::String<MAX_DEVICE_NAME_LEN>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("PM-Logger");
        Self {
            // Scheduling
            sync_wait_timeout_ms: 30_000,   // 30 s
            log_interval_ms: 15 * 60_000,   // 15 min
            live_update_interval_ms: 5_000, // 5 s
            live_bootstrap_delay_ms: MIN_DELAY.get(),

            // Heartbeat
            heartbeat_slow_ms: 1_000,
            heartbeat_fast_ms: 100,

            // Sensor bus
            sensor_i2c_address: crate::sensors::hm3301::DEFAULT_ADDRESS,
            sensor_sda_gpio: pins::SENSOR_I2C_SDA_GPIO,
            sensor_scl_gpio: pins::SENSOR_I2C_SCL_GPIO,

            device_name,
        }
    }
}

/// Validated scheduling durations.
///
/// Every duration is non-zero, so the timer registry can never be handed
/// a zero delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPlan {
    pub sync_wait_timeout: NonZeroU32,
    pub log_interval: NonZeroU32,
    pub live_update_interval: NonZeroU32,
    pub live_bootstrap_delay: NonZeroU32,
    pub heartbeat_slow: NonZeroU32,
    pub heartbeat_fast: NonZeroU32,
}

impl LoggerConfig {
    /// Parse a JSON override.  Missing fields keep their defaults.
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_slice(raw).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_wait_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "sync_wait_timeout_ms must be non-zero",
            ));
        }
        if self.log_interval_ms < self.sync_wait_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "log_interval_ms must be >= sync_wait_timeout_ms",
            ));
        }
        if self.live_update_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "live_update_interval_ms must be non-zero",
            ));
        }
        if self.live_bootstrap_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "live_bootstrap_delay_ms must be non-zero",
            ));
        }
        if self.heartbeat_fast_ms == 0 || self.heartbeat_slow_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "heartbeat intervals must be non-zero",
            ));
        }
        if self.heartbeat_fast_ms > self.heartbeat_slow_ms {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_fast_ms must be <= heartbeat_slow_ms",
            ));
        }
        if self.sensor_i2c_address > 0x7F {
            return Err(ConfigError::ValidationFailed(
                "sensor_i2c_address must be a 7-bit address",
            ));
        }
        if self.sensor_sda_gpio > MAX_GPIO || self.sensor_scl_gpio > MAX_GPIO {
            return Err(ConfigError::ValidationFailed("sensor bus GPIO out of range"));
        }
        if self.sensor_sda_gpio == self.sensor_scl_gpio {
            return Err(ConfigError::ValidationFailed("SDA and SCL must differ"));
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name must not be empty"));
        }
        Ok(())
    }

    /// Validate and convert the scheduling fields into a [`TimingPlan`].
    pub fn timing(&self) -> Result<TimingPlan, ConfigError> {
        self.validate()?;
        let nz = |v: u32| NonZeroU32::new(v).ok_or(ConfigError::ValidationFailed("zero duration"));
        Ok(TimingPlan {
            sync_wait_timeout: nz(self.sync_wait_timeout_ms)?,
            log_interval: nz(self.log_interval_ms)?,
            live_update_interval: nz(self.live_update_interval_ms)?,
            live_bootstrap_delay: nz(self.live_bootstrap_delay_ms)?,
            heartbeat_slow: nz(self.heartbeat_slow_ms)?,
            heartbeat_fast: nz(self.heartbeat_fast_ms)?,
        })
    }
}
