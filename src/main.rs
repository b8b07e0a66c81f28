//! PM-Logger Firmware: Main Entry Point
//!
//! Hexagonal architecture driven by a single-threaded run loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Hm3301<I2cDriver>  BleRadio     SdCardStore   SyncedClock     │
//! │  (SensorPort)       (RadioPort)  (StoragePort) (CalendarClock) │
//! │  LogEventSink (EventSink)                                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Scheduler (pure logic)                    │    │
//! │  │  Mode · ConnectionTracker · TimerRegistry · Gate       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  RunLoop (raw radio FIFO, then due timers in deadline order)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;

use pmlogger::adapters::ble::BleRadio;
use pmlogger::adapters::log_sink::LogEventSink;
use pmlogger::adapters::sd_card::{SdCardStore, SpiSdParts, SpiSdVolume};
use pmlogger::adapters::time::{MonotonicClock, SyncedClock, Uptime};
use pmlogger::app::ports::StoragePort;
use pmlogger::app::service::Scheduler;
use pmlogger::config::LoggerConfig;
use pmlogger::error::Error;
use pmlogger::pins;
use pmlogger::run_loop::RunLoop;
use pmlogger::sensors::Hm3301;

/// Longest single sleep between polls.
const MAX_IDLE_MS: u64 = 50;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PM-Logger v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let uptime = MonotonicClock::new();

    // ── 2. SD card + config override ──────────────────────────
    // SAFETY: the card pins are used by the SPI host only.
    let volume = SpiSdVolume::new(unsafe {
        SpiSdParts {
            spi: peripherals.spi2,
            sclk: AnyIOPin::new(pins::SD_SPI_SCLK_GPIO),
            mosi: AnyIOPin::new(pins::SD_SPI_MOSI_GPIO),
            miso: AnyIOPin::new(pins::SD_SPI_MISO_GPIO),
            cs: AnyIOPin::new(pins::SD_SPI_CS_GPIO),
        }
    });
    let mut storage = SdCardStore::new(pins::SD_MOUNT_POINT, volume);
    let config = if storage.mount() {
        match storage.load_config() {
            Ok(cfg) => {
                info!("Config loaded from SD card");
                cfg
            }
            Err(e) => {
                warn!("SD config not used ({}), using defaults", e);
                LoggerConfig::default()
            }
        }
    } else {
        LoggerConfig::default()
    };

    // ── 3. Sensor bus ─────────────────────────────────────────
    // SAFETY: config validation restricts these to distinct, existing
    // GPIOs that no other driver claims.
    let (sda, scl) = unsafe {
        (
            AnyIOPin::new(i32::from(config.sensor_sda_gpio)),
            AnyIOPin::new(i32::from(config.sensor_scl_gpio)),
        )
    };
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(pins::SENSOR_I2C_BAUD_HZ)),
    )?;
    let sensor = Hm3301::new(i2c);

    // ── 4. Scheduler ──────────────────────────────────────────
    let radio = BleRadio::new(config.device_name.clone());
    let clock = SyncedClock::new(MonotonicClock::new());
    let mut sink = LogEventSink::new();
    let mut sched = Scheduler::new(&config, sensor, radio, storage, clock)?;

    if sched.init_sensor(&mut sink).is_err() {
        info!("Continuing without sensor readings");
    }
    if let Err(e) = sched.mount_storage() {
        info!("Logging disabled for this boot ({})", e);
    }

    // ── 5. Radio ──────────────────────────────────────────────
    sched.radio_mut().bring_up().map_err(Error::from)?;
    sched.arm_heartbeat(uptime.uptime_ms());

    let mut run_loop: RunLoop = RunLoop::new();

    info!("System ready. Entering run loop.");

    // ── 6. Run loop ───────────────────────────────────────────
    loop {
        sched.radio_mut().forward_events(&mut run_loop);

        if let Some(raw) = sched.radio_mut().take_time_write() {
            match sched.clock_mut().apply_sync_payload(&raw) {
                Ok(_) => sched.radio_mut().confirm_time_sync(),
                Err(e) => warn!("Time sync rejected: {}", e),
            }
        }

        let now_ms = uptime.uptime_ms();
        run_loop.poll(&mut sched, now_ms, &mut sink);

        let idle = run_loop.idle_budget(&sched, uptime.uptime_ms(), MAX_IDLE_MS);
        if idle > 0 {
            FreeRtos::delay_ms(idle as u32);
        }
    }
}
