//! PM-Logger firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod calendar;
pub mod config;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod pins;
pub mod radio_event;
pub mod run_loop;
pub mod timers;

pub mod adapters;
pub mod sensors;
