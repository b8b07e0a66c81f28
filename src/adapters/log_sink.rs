//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Failures come out at `warn`, routine traffic at `info` / `debug`.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::error::Error;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    records: u32,
    skips: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended since boot.
    pub fn records(&self) -> u32 {
        self.records
    }

    /// Log cycles that persisted nothing since boot.
    pub fn skips(&self) -> u32 {
        self.skips
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => {
                info!("START | mode={:?}", mode);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            AppEvent::PeerConnected(peer) => {
                info!("LINK  | connected handle={}", peer);
            }
            AppEvent::PeerDisconnected(peer) => {
                info!("LINK  | disconnected handle={}", peer);
            }
            AppEvent::RecordLogged { partition, reading } => {
                self.records = self.records.wrapping_add(1);
                info!(
                    "LOG   | {}.txt | PM1.0={} PM2.5={} PM10={}",
                    partition, reading.pm1_0, reading.pm2_5, reading.pm10
                );
            }
            AppEvent::LogSkipped(reason) => {
                self.skips = self.skips.wrapping_add(1);
                warn!("LOG   | skipped: {}", Error::from(*reason));
                debug!("LOG   | skip detail: {}", reason);
            }
            AppEvent::LiveSample(reading) => {
                debug!("LIVE  | PM2.5={}", reading.pm2_5);
            }
            AppEvent::SensorFault(err) => {
                warn!("SENSE | {}", err);
            }
        }
    }
}
