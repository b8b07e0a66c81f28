//! Seeed HM3301 laser particulate sensor driver.
//!
//! The sensor powers up in UART mode; writing the select command `0x88`
//! switches it to I2C.  Every read returns a 29-byte frame:
//!
//! ```text
//!  0      2      4        6        8       10 .. 27   28
//! ┌──────┬──────┬────────┬────────┬────────┬────────┬─────┐
//! │ rsvd │ num  │ PM1.0  │ PM2.5  │ PM10   │  ...   │ sum │
//! └──────┴──────┴────────┴────────┴────────┴────────┴─────┘
//!                 CF=1 standard particulate, big-endian u16
//! ```
//!
//! Generic over any `embedded_hal::i2c::I2c` bus: the ESP-IDF
//! `I2cDriver` on device, a scripted mock on the host.

use embedded_hal::i2c::I2c;
use log::debug;

use crate::app::ports::{BusConfig, RAW_FRAME_LEN, RawFrame, Reading, SensorPort};
use crate::error::SensorError;

/// Factory-default I2C address.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// "Select I2C communication" command.
const CMD_SELECT_I2C: u8 = 0x88;

const CHECKSUM_INDEX: usize = RAW_FRAME_LEN - 1;

/// Low 8 bits of the byte sum over everything before the checksum byte.
pub fn frame_checksum(frame: &RawFrame) -> u8 {
    frame[..CHECKSUM_INDEX]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Validate a raw frame.  An all-zero frame passes the checksum but
/// carries no data (the fan is still spinning up).
pub fn check_frame(frame: &RawFrame) -> Result<(), SensorError> {
    if frame_checksum(frame) != frame[CHECKSUM_INDEX] {
        return Err(SensorError::Checksum);
    }
    if frame.iter().all(|b| *b == 0) {
        return Err(SensorError::NoData);
    }
    Ok(())
}

/// Decode the standard-particulate fields.  Pure and total.
pub fn decode(frame: &RawFrame) -> Reading {
    let be = |i: usize| u16::from_be_bytes([frame[i], frame[i + 1]]);
    Reading {
        pm1_0: be(4),
        pm2_5: be(6),
        pm10: be(8),
    }
}

pub struct Hm3301<I> {
    i2c: I,
    address: u8,
    initialized: bool,
}

impl<I: I2c> Hm3301<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn bus_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    /// Give the bus back (tests inspect the mock through this).
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> SensorPort for Hm3301<I> {
    fn initialize(&mut self, bus: &BusConfig) -> Result<(), SensorError> {
        self.address = bus.address;
        self.initialized = false;
        self.i2c
            .write(self.address, &[CMD_SELECT_I2C])
            .map_err(|e| {
                debug!("HM3301: select-I2C write failed: {:?}", e);
                SensorError::Bus
            })?;
        self.initialized = true;
        debug!(
            "HM3301: I2C mode at 0x{:02x} (SDA={}, SCL={})",
            self.address, bus.sda_gpio, bus.scl_gpio
        );
        Ok(())
    }

    fn read_raw(&mut self, frame: &mut RawFrame) -> Result<(), SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }
        self.i2c.read(self.address, frame).map_err(|e| {
            debug!("HM3301: frame read failed: {:?}", e);
            SensorError::Bus
        })?;
        check_frame(frame)
    }

    fn parse(frame: &RawFrame) -> Reading {
        decode(frame)
    }
}
