//! Connection tracker.
//!
//! Holds the current peer link and the time-sync latch.  Only the
//! scheduler mutates it; everything else reads.

use crate::app::ports::PeerHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionTracker {
    peer: Option<PeerHandle>,
    sync_confirmed: bool,
}

impl ConnectionTracker {
    pub const fn new() -> Self {
        Self {
            peer: None,
            sync_confirmed: false,
        }
    }

    pub fn peer(&self) -> Option<PeerHandle> {
        self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    pub fn set_peer(&mut self, peer: PeerHandle) {
        self.peer = Some(peer);
    }

    /// Clear the peer if `handle` matches it.  Returns whether it did.
    pub fn release(&mut self, handle: PeerHandle) -> bool {
        if self.peer == Some(handle) {
            self.peer = None;
            true
        } else {
            false
        }
    }

    pub fn sync_confirmed(&self) -> bool {
        self.sync_confirmed
    }

    /// Fold the collaborator's sync flag into the latch.  Once set it
    /// stays set for the life of the process.
    pub fn observe_sync(&mut self, synchronized: bool) -> bool {
        self.sync_confirmed |= synchronized;
        self.sync_confirmed
    }
}
