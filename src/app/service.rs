//! Scheduler: the hexagonal core.
//!
//! [`Scheduler`] owns every piece of mutable state the firmware has: the
//! mode, the connection tracker, the timer registry, the heartbeat, and
//! one value of each collaborator.  All handlers run to completion on the
//! single event-loop thread, entered through [`Scheduler::dispatch`].
//!
//! ```text
//!  RadioPort ──┐                          ┌──▶ EventSink
//! SensorPort ──┤  ┌────────────────────┐  │
//!              ├─▶│     Scheduler      │──┤
//! StoragePort ─┤  │ Mode · Conn · Timers│  │
//! CalendarClock┘  └────────────────────┘  └──▶ TimerRegistry (arm/cancel)
//! ```
//!
//! Mode transitions:
//!
//! ```text
//!  AwaitingSync/Serving --cycle, unsynced--> AwaitingSync (short deadline)
//!  AwaitingSync/Serving --cycle, synced----> Serving      (log, long deadline)
//!  AwaitingSync/Serving --connected--------> LiveConnected
//!  LiveConnected --disconnected, no peer---> AwaitingSync/Serving
//!  LiveConnected --live timer-------------> LiveConnected
//! ```

use log::{debug, warn};

use crate::config::{LoggerConfig, TimingPlan};
use crate::connection::ConnectionTracker;
use crate::error::{Error, Result};
use crate::heartbeat::Heartbeat;
use crate::radio_event::Event;
use crate::timers::{TimerDescriptor, TimerId, TimerRegistry};

use super::events::{AppEvent, Mode};
use super::gate;
use super::ports::{
    BusConfig, CalendarClock, EventSink, PeerHandle, RAW_FRAME_LEN, RadioPort, Reading,
    SensorPort, StoragePort,
};

// ───────────────────────────────────────────────────────────────
// Scheduler
// ───────────────────────────────────────────────────────────────

pub struct Scheduler<S, R, P, C> {
    plan: TimingPlan,
    bus: BusConfig,
    mode: Mode,
    started: bool,
    conn: ConnectionTracker,
    timers: TimerRegistry,
    heartbeat: Heartbeat,
    /// Monotonic time of the event being handled.
    now_ms: u64,

    sensor: S,
    radio: R,
    storage: P,
    clock: C,
}

impl<S, R, P, C> Scheduler<S, R, P, C>
where
    S: SensorPort,
    R: RadioPort,
    P: StoragePort,
    C: CalendarClock,
{
    /// Build the scheduler.  Fails only if `config` does not validate.
    ///
    /// No timers are armed and nothing is advertised until
    /// [`Event::Ready`] is dispatched.
    pub fn new(
        config: &LoggerConfig,
        sensor: S,
        radio: R,
        storage: P,
        clock: C,
    ) -> Result<Self> {
        Ok(Self {
            plan: config.timing()?,
            bus: BusConfig::from(config),
            mode: Mode::AwaitingSync,
            started: false,
            conn: ConnectionTracker::new(),
            timers: TimerRegistry::new(),
            heartbeat: Heartbeat::new(),
            now_ms: 0,
            sensor,
            radio,
            storage,
            clock,
        })
    }

    // ── Startup ───────────────────────────────────────────────

    /// Switch the sensor into its read mode.  A failure is reported and
    /// left in place: later reads keep failing, nothing else changes.
    pub fn init_sensor(&mut self, sink: &mut impl EventSink) -> Result<()> {
        self.sensor.initialize(&self.bus).map_err(|e| {
            let err = Error::SensorInit(e);
            sink.emit(&AppEvent::SensorFault(err));
            err
        })
    }

    /// Mount storage.  On failure logging stays off for this boot.
    pub fn mount_storage(&mut self) -> Result<()> {
        if self.storage.mount() {
            Ok(())
        } else {
            Err(Error::StorageMount)
        }
    }

    /// Start the status LED blinking.
    pub fn arm_heartbeat(&mut self, now_ms: u64) {
        self.timers
            .arm(TimerId::Heartbeat, self.plan.heartbeat_slow, true, now_ms);
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Single entry point for every event.  Never re-entered.
    pub fn dispatch(&mut self, event: Event, now_ms: u64, sink: &mut impl EventSink) {
        self.now_ms = now_ms;
        match event {
            Event::Ready => self.on_ready(sink),
            Event::ConnectionEstablished(peer) => self.on_connection_established(peer, sink),
            Event::Disconnected(handle) => self.on_disconnection(handle, sink),
            Event::TimerFired(TimerId::Cycle) => self.on_cycle_timer_fired(sink),
            Event::TimerFired(TimerId::LiveUpdate) => self.on_live_timer_fired(sink),
            Event::TimerFired(TimerId::Heartbeat) => self.on_heartbeat(),
        }
    }

    /// Disarm and return the earliest due timer.
    pub fn take_due_timer(&mut self, now_ms: u64) -> Option<TimerDescriptor> {
        self.timers.pop_due(now_ms)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    // ── Mode controller ───────────────────────────────────────

    fn on_ready(&mut self, sink: &mut impl EventSink) {
        let first = !self.started;
        self.started = true;
        match self.conn.peer() {
            Some(peer) => warn!("Radio ready while {} is connected; ignoring", peer),
            None => self.enter_serving_mode(sink),
        }
        if first {
            sink.emit(&AppEvent::Started(self.mode));
        }
    }

    /// Advertise and arm the cycle timer.  The deadline depends on
    /// whether wall-clock time has been confirmed.
    fn enter_serving_mode(&mut self, sink: &mut impl EventSink) {
        self.timers.cancel(TimerId::LiveUpdate);
        let synced = self.refresh_sync();
        let delay = if synced {
            self.plan.log_interval
        } else {
            self.plan.sync_wait_timeout
        };
        self.radio.start_advertising();
        self.timers.arm(TimerId::Cycle, delay, false, self.now_ms);
        debug!("Cycle timer armed for {} ms (synced={})", delay, synced);
        self.set_mode(
            if synced {
                Mode::Serving
            } else {
                Mode::AwaitingSync
            },
            sink,
        );
    }

    fn on_cycle_timer_fired(&mut self, sink: &mut impl EventSink) {
        if self.mode == Mode::LiveConnected {
            debug!("Stale cycle firing while connected; ignoring");
            return;
        }
        self.radio.stop_advertising();
        if self.refresh_sync() {
            self.acquire_and_log(sink);
        }
        self.enter_serving_mode(sink);
    }

    fn on_connection_established(&mut self, peer: PeerHandle, sink: &mut impl EventSink) {
        self.timers.cancel(TimerId::Cycle);
        self.conn.set_peer(peer);
        self.radio.set_peer(Some(peer));
        self.timers.arm(
            TimerId::LiveUpdate,
            self.plan.live_bootstrap_delay,
            true,
            self.now_ms,
        );
        sink.emit(&AppEvent::PeerConnected(peer));
        self.set_mode(Mode::LiveConnected, sink);
    }

    fn on_disconnection(&mut self, handle: PeerHandle, sink: &mut impl EventSink) {
        if !self.conn.release(handle) {
            debug!("Disconnection for untracked handle {}; ignoring", handle);
            return;
        }
        self.radio.set_peer(None);
        self.timers.cancel(TimerId::LiveUpdate);
        sink.emit(&AppEvent::PeerDisconnected(handle));
        if self.conn.is_connected() {
            return;
        }
        if self.started {
            self.enter_serving_mode(sink);
        } else {
            // The stack has not reported ready: nothing to advertise on yet.
            self.set_mode(Mode::AwaitingSync, sink);
        }
    }

    fn on_live_timer_fired(&mut self, sink: &mut impl EventSink) {
        if let Some(reading) = self.acquire(sink) {
            self.radio.notify_pm25(reading.pm2_5);
            sink.emit(&AppEvent::LiveSample(reading));
        }
        if self.conn.is_connected() {
            self.timers.arm(
                TimerId::LiveUpdate,
                self.plan.live_update_interval,
                true,
                self.now_ms,
            );
        }
    }

    fn on_heartbeat(&mut self) {
        let (on, delay) = self.heartbeat.step(self.conn.is_connected(), &self.plan);
        self.radio.set_status_led(on);
        self.timers.arm(TimerId::Heartbeat, delay, true, self.now_ms);
    }

    // ── Internal ──────────────────────────────────────────────

    fn refresh_sync(&mut self) -> bool {
        self.conn.observe_sync(self.radio.is_time_synchronized())
    }

    fn set_mode(&mut self, to: Mode, sink: &mut impl EventSink) {
        if self.mode != to {
            let from = self.mode;
            self.mode = to;
            sink.emit(&AppEvent::ModeChanged { from, to });
        }
    }

    fn acquire(&mut self, sink: &mut impl EventSink) -> Option<Reading> {
        let mut frame = [0u8; RAW_FRAME_LEN];
        match self.sensor.read_raw(&mut frame) {
            Ok(()) => Some(S::parse(&frame)),
            Err(e) => {
                sink.emit(&AppEvent::SensorFault(Error::SensorRead(e)));
                None
            }
        }
    }

    fn acquire_and_log(&mut self, sink: &mut impl EventSink) {
        let Some(reading) = self.acquire(sink) else {
            return;
        };
        match gate::try_log(
            &mut self.storage,
            &self.clock,
            self.conn.sync_confirmed(),
            reading,
        ) {
            Ok(record) => sink.emit(&AppEvent::RecordLogged {
                partition: record.partition,
                reading,
            }),
            Err(skip) => sink.emit(&AppEvent::LogSkipped(skip)),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn connection(&self) -> &ConnectionTracker {
        &self.conn
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn plan(&self) -> &TimingPlan {
        &self.plan
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn storage(&self) -> &P {
        &self.storage
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}
