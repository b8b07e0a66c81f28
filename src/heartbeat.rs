//! Status LED heartbeat.
//!
//! Disconnected: a short blip once per slow period.
//! Connected: a double blip, because every other OFF phase is shortened
//! to the fast interval.
//!
//! ```text
//!  idle       ▔▁▁▁▁▁▁▁▁▁▁▔▁▁▁▁▁▁▁▁▁▁▔
//!  connected  ▔▁▔▁▁▁▁▁▁▁▁▁▁▔▁▔▁▁▁▁▁▁▁▁▁▁▔
//! ```

use core::num::NonZeroU32;

use crate::config::TimingPlan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heartbeat {
    led_on: bool,
    quick_flash: bool,
}

impl Heartbeat {
    pub const fn new() -> Self {
        Self {
            led_on: false,
            quick_flash: false,
        }
    }

    /// Advance one phase.  Returns the new LED level and the delay until
    /// the next phase.
    pub fn step(&mut self, connected: bool, plan: &TimingPlan) -> (bool, NonZeroU32) {
        self.led_on = !self.led_on;
        if !connected {
            self.quick_flash = false;
        } else if self.led_on {
            self.quick_flash = !self.quick_flash;
        }
        let delay = if self.led_on || self.quick_flash {
            plan.heartbeat_fast
        } else {
            plan.heartbeat_slow
        };
        (self.led_on, delay)
    }
}
