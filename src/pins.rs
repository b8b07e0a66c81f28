//! GPIO / peripheral pin assignments for the PM-Logger board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  The sensor bus pins here are the defaults;
//! `logger.json` may override them.

// ---------------------------------------------------------------------------
// HM3301 particulate sensor (I²C0)
// ---------------------------------------------------------------------------

pub const SENSOR_I2C_SDA_GPIO: u8 = 8;
pub const SENSOR_I2C_SCL_GPIO: u8 = 9;
/// The HM3301 supports standard mode only.
pub const SENSOR_I2C_BAUD_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// microSD card (SPI2)
// ---------------------------------------------------------------------------

pub const SD_SPI_MOSI_GPIO: i32 = 11;
pub const SD_SPI_MISO_GPIO: i32 = 13;
pub const SD_SPI_SCLK_GPIO: i32 = 12;
pub const SD_SPI_CS_GPIO: i32 = 10;

/// VFS mount point of the card's FAT volume.
pub const SD_MOUNT_POINT: &str = "/sdcard";

// ---------------------------------------------------------------------------
// Status LED (discrete, active HIGH)
// ---------------------------------------------------------------------------

pub const STATUS_LED_GPIO: i32 = 2;
