//! Sensor drivers.
//!
//! Each driver implements [`SensorPort`](crate::app::ports::SensorPort)
//! and is owned by value inside the scheduler, constructed once at
//! startup.

pub mod hm3301;

pub use hm3301::Hm3301;
