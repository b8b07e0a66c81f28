//! Timer registry.
//!
//! Three logical timers live for the whole process lifetime.  Each is a
//! one-shot, re-armable slot holding an absolute deadline in monotonic
//! milliseconds.  The registry owns no business logic: the run loop asks
//! it which timer is due, and the scheduler's handlers re-arm what they
//! need.
//!
//! ```text
//!   arm(id, delay) ──▶ ┌──────────────────────┐
//!   cancel(id)     ──▶ │ Cycle  | Live | Beat │ ──▶ pop_due(now) ──▶ TimerFired(id)
//!                      └──────────────────────┘
//! ```
//!
//! `arm` always replaces an existing deadline, so a timer can never hold
//! two pending firings.

use core::num::NonZeroU32;

/// Smallest representable positive delay.  The live-update bootstrap uses
/// it so the first push still queues behind pending radio events.
pub const MIN_DELAY: NonZeroU32 = NonZeroU32::MIN;

/// Logical timer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Advertise / log alternation while not connected.
    Cycle,
    /// Live telemetry push while connected.
    LiveUpdate,
    /// Status LED blink.
    Heartbeat,
}

impl TimerId {
    const fn slot(self) -> usize {
        match self {
            TimerId::Cycle => 0,
            TimerId::LiveUpdate => 1,
            TimerId::Heartbeat => 2,
        }
    }
}

/// Snapshot of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDescriptor {
    pub id: TimerId,
    /// Absolute monotonic deadline (ms).
    pub deadline_ms: u64,
    /// The owning handler re-arms this timer after it fires.
    pub recurring: bool,
    /// Arm order, breaks ties between equal deadlines.
    seq: u64,
}

pub struct TimerRegistry {
    slots: [Option<TimerDescriptor>; 3],
    next_seq: u64,
}

impl TimerRegistry {
    pub const fn new() -> Self {
        Self {
            slots: [None; 3],
            next_seq: 0,
        }
    }

    /// Arm `id` to fire `delay` ms after `now_ms`.  Replaces any pending
    /// deadline for the same timer.
    pub fn arm(&mut self, id: TimerId, delay: NonZeroU32, recurring: bool, now_ms: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots[id.slot()] = Some(TimerDescriptor {
            id,
            deadline_ms: now_ms.saturating_add(u64::from(delay.get())),
            recurring,
            seq,
        });
    }

    /// Disarm `id`.  No-op if it is not armed.
    pub fn cancel(&mut self, id: TimerId) {
        self.slots[id.slot()] = None;
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.slots[id.slot()].is_some()
    }

    pub fn get(&self, id: TimerId) -> Option<TimerDescriptor> {
        self.slots[id.slot()]
    }

    /// Earliest pending deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<u64> {
        self.earliest().map(|t| t.deadline_ms)
    }

    /// Disarm and return the earliest timer whose deadline is `<= now_ms`.
    ///
    /// Call repeatedly to drain every due timer; each call yields at most
    /// one, in deadline order, arm order on ties.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerDescriptor> {
        let due = self.earliest().filter(|t| t.deadline_ms <= now_ms)?;
        self.slots[due.id.slot()] = None;
        Some(due)
    }

    fn earliest(&self) -> Option<TimerDescriptor> {
        self.slots
            .iter()
            .flatten()
            .copied()
            .min_by_key(|t| (t.deadline_ms, t.seq))
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
