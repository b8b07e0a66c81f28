//! Application core: pure domain logic, zero I/O.
//!
//! Mode control, the logging gate and event dispatch for the datalogger.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod gate;
pub mod ports;
pub mod service;
