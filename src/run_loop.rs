//! Single-threaded cooperative run loop.
//!
//! Radio callbacks post raw events; the loop drains them in arrival
//! order, then fires every due timer one at a time.  Handlers never nest:
//! each runs to completion before the next event is looked at.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ BLE stack   │────▶│  Event FIFO  │────▶│              │
//! └─────────────┘     └──────────────┘     │  Scheduler   │
//!                     ┌──────────────┐     │  .dispatch() │
//!                     │ Timer expiry │────▶│              │
//!                     └──────────────┘     └──────────────┘
//! ```

use heapless::Deque;
use log::{debug, warn};

use crate::app::ports::{CalendarClock, EventSink, RadioPort, SensorPort, StoragePort};
use crate::app::service::Scheduler;
use crate::radio_event::{Event, RadioEvent};

/// Default FIFO depth.
pub const EVENT_QUEUE_CAP: usize = 16;

pub struct RunLoop<const N: usize = EVENT_QUEUE_CAP> {
    queue: Deque<RadioEvent, N>,
    dropped: u32,
}

impl<const N: usize> RunLoop<N> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            dropped: 0,
        }
    }

    /// Queue a raw radio event.  Returns `false` if the queue is full
    /// (event dropped).
    pub fn post(&mut self, event: RadioEvent) -> bool {
        if self.queue.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("Event queue full; dropped {:?}", event);
            return false;
        }
        true
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Events lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Run every handler that is ready at `now_ms`.  Returns how many ran.
    pub fn poll<S, R, P, C>(
        &mut self,
        scheduler: &mut Scheduler<S, R, P, C>,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> usize
    where
        S: SensorPort,
        R: RadioPort,
        P: StoragePort,
        C: CalendarClock,
    {
        let mut handled = 0;
        while let Some(raw) = self.queue.pop_front() {
            if let Some(event) = raw.classify() {
                scheduler.dispatch(event, now_ms, sink);
                handled += 1;
            }
        }
        while let Some(fired) = scheduler.take_due_timer(now_ms) {
            scheduler.dispatch(Event::TimerFired(fired.id), now_ms, sink);
            if fired.recurring && !scheduler.timers().is_armed(fired.id) {
                debug!("{:?} timer stopped after firing", fired.id);
            }
            handled += 1;
        }
        handled
    }

    /// How long the caller may sleep before the next poll, capped at
    /// `max_ms`.  Zero when events are already waiting.
    pub fn idle_budget<S, R, P, C>(
        &self,
        scheduler: &Scheduler<S, R, P, C>,
        now_ms: u64,
        max_ms: u64,
    ) -> u64
    where
        S: SensorPort,
        R: RadioPort,
        P: StoragePort,
        C: CalendarClock,
    {
        if !self.queue.is_empty() {
            return 0;
        }
        scheduler
            .next_deadline()
            .map_or(max_ms, |d| d.saturating_sub(now_ms).min(max_ms))
    }
}

impl<const N: usize> Default for RunLoop<N> {
    fn default() -> Self {
        Self::new()
    }
}
