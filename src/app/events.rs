//! Outbound application events.
//!
//! The [`Scheduler`](super::service::Scheduler) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them in a test.

use super::gate::{LogSkip, PARTITION_LEN};
use super::ports::{PeerHandle, Reading};
use crate::error::Error;

/// Operating mode of the device.  Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Advertising with the short sync-wait deadline (boot state).
    AwaitingSync,
    /// Advertising with the long log-interval deadline.
    Serving,
    /// A peer is connected and live updates are running.
    LiveConnected,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Radio stack reported ready; first serving cycle begins.
    Started(Mode),

    /// The mode controller moved between modes.
    ModeChanged { from: Mode, to: Mode },

    /// A peer connected.
    PeerConnected(PeerHandle),

    /// The tracked peer disconnected.
    PeerDisconnected(PeerHandle),

    /// One record was appended to the `<partition>.txt` log.
    RecordLogged {
        partition: heapless::String<PARTITION_LEN>,
        reading: Reading,
    },

    /// A log cycle ran but nothing was persisted.
    LogSkipped(LogSkip),

    /// A live sample was pushed to the peer.
    LiveSample(Reading),

    /// Sensor init or acquisition failed ([`Error::SensorInit`] or
    /// [`Error::SensorRead`]); this cycle's log or notify is skipped.
    SensorFault(Error),
}
