//! Raw radio-stack events and their mapping onto core events.
//!
//! The BLE adapter translates stack callbacks into [`RadioEvent`]s and
//! posts them to the run loop.  [`RadioEvent::classify`] keeps only the
//! three categories the scheduler cares about; everything else is
//! dropped here without side effects.
//!
//! ```text
//!  StackState(Working)           ──▶ Event::Ready
//!  LeMeta(ConnectionComplete ok) ──▶ Event::ConnectionEstablished(h)
//!  DisconnectionComplete{h, ..}  ──▶ Event::Disconnected(h)
//!  anything else                 ──▶ (discarded)
//! ```

use crate::app::ports::PeerHandle;
use crate::timers::TimerId;

/// Host stack lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Off,
    Initializing,
    Working,
    Halting,
}

/// LE meta subevents surfaced by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeSubevent {
    /// Link setup finished.  `status == 0` means success.
    ConnectionComplete { status: u8, handle: u16 },
    ConnectionUpdateComplete { handle: u16 },
    AdvertisingReport,
    Other(u8),
}

/// Raw event as delivered by the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    StackState(StackState),
    LeMeta(LeSubevent),
    DisconnectionComplete { handle: u16, reason: u8 },
    Other(u8),
}

/// Events the scheduler dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Ready,
    ConnectionEstablished(PeerHandle),
    Disconnected(PeerHandle),
    TimerFired(TimerId),
}

impl RadioEvent {
    /// Demultiplex into a core [`Event`], or `None` if irrelevant.
    pub fn classify(self) -> Option<Event> {
        match self {
            RadioEvent::StackState(StackState::Working) => Some(Event::Ready),
            RadioEvent::LeMeta(LeSubevent::ConnectionComplete { status: 0, handle }) => {
                Some(Event::ConnectionEstablished(PeerHandle::new(handle)))
            }
            RadioEvent::DisconnectionComplete { handle, .. } => {
                Some(Event::Disconnected(PeerHandle::new(handle)))
            }
            _ => None,
        }
    }
}
