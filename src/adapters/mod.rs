//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements     | Connects to                    |
//! |------------|----------------|--------------------------------|
//! | `ble`      | RadioPort      | Bluedroid GATT server, LED GPIO|
//! | `sd_card`  | StoragePort    | FAT volume on SPI microSD      |
//! | `time`     | CalendarClock  | ESP32 system timer + time sync |
//! | `log_sink` | EventSink      | Serial log output              |
//!
//! The HM3301 driver in [`crate::sensors`] implements `SensorPort`.

pub mod ble;
pub mod log_sink;
pub mod sd_card;
pub mod time;
